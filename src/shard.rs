//! Shard layout, candidate enumeration, and shard selection.
//!
//! A resource group holds at most `resources_per_group` resources and each
//! storage account should carry at most `disks_per_account` disks, so a group
//! is served by `resources_per_group / disks_per_account` storage accounts.
//! Account `k` (1-based) is named `base + zero_pad_2(k)`.

use thiserror::Error;

use crate::types::AccountName;

/// Disks per storage account recommended by Azure for steady performance.
pub const DEFAULT_DISKS_PER_ACCOUNT: u32 = 40;

/// Historical Azure ceiling on resources in a single resource group.
pub const DEFAULT_RESOURCES_PER_GROUP: u32 = 800;

/// Largest shard count whose suffix still fits in two digits.
pub const MAX_SHARDS: u32 = 99;

/// Raised when every shard is already full. The resource group has to be
/// split or a new one provisioned; retrying does not help.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("no storage account can be selected: {vm_count} VMs exceed shard capacity {capacity}")]
pub struct CapacityExhausted {
    /// VM count observed in the resource group.
    pub vm_count: u64,
    /// Total number of disks the candidate list can hold.
    pub capacity: u64,
}

/// Errors raised by shard layout construction.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ShardError {
    /// Raised when the layout yields no shards or too many for a two-digit suffix.
    #[error(
        "invalid shard layout: {resources_per_group} resources / {disks_per_account} disks per account must give 1..=99 shards"
    )]
    InvalidLayout {
        /// Configured disks per account.
        disks_per_account: u32,
        /// Configured resources per resource group.
        resources_per_group: u32,
    },
}

/// Shard selected for the next virtual machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllocationDecision {
    /// Zero-based index into the candidate list.
    pub shard_index: usize,
    /// Storage account name at that index.
    pub account_name: AccountName,
    /// VM count the decision was computed from.
    pub vm_count: u64,
}

/// Sizing limits used to derive the number of shards in a resource group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShardLayout {
    disks_per_account: u32,
    resources_per_group: u32,
}

impl Default for ShardLayout {
    fn default() -> Self {
        Self {
            disks_per_account: DEFAULT_DISKS_PER_ACCOUNT,
            resources_per_group: DEFAULT_RESOURCES_PER_GROUP,
        }
    }
}

impl ShardLayout {
    /// Creates a layout from explicit limits.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidLayout`] when the limits yield zero shards
    /// or more than [`MAX_SHARDS`].
    pub const fn new(
        disks_per_account: u32,
        resources_per_group: u32,
    ) -> Result<Self, ShardError> {
        let layout = Self {
            disks_per_account,
            resources_per_group,
        };
        let shards = layout.shard_count();
        if shards == 0 || shards > MAX_SHARDS {
            return Err(ShardError::InvalidLayout {
                disks_per_account,
                resources_per_group,
            });
        }
        Ok(layout)
    }

    /// Disks each storage account is expected to carry.
    #[must_use]
    pub const fn disks_per_account(&self) -> u32 {
        self.disks_per_account
    }

    /// Resource ceiling of a resource group.
    #[must_use]
    pub const fn resources_per_group(&self) -> u32 {
        self.resources_per_group
    }

    /// Number of storage accounts a resource group can be split across.
    #[must_use]
    pub const fn shard_count(&self) -> u32 {
        match self.resources_per_group.checked_div(self.disks_per_account) {
            Some(shards) => shards,
            None => 0,
        }
    }

    /// Enumerates the candidate account names for `base`.
    #[must_use]
    pub fn candidates(&self, base: &str) -> Vec<AccountName> {
        generate_candidates(base, self.shard_count())
    }

    /// Picks the shard that should host the disk of the next virtual machine.
    ///
    /// One slot is reserved for the VM about to be created, so a group holding
    /// exactly `disks_per_account - 1` VMs still lands on the first shard.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExhausted`] when no candidate has room.
    pub fn select(
        &self,
        candidates: &[AccountName],
        vm_count: u64,
    ) -> Result<AllocationDecision, CapacityExhausted> {
        let effective = vm_count.saturating_add(1);
        let increment = u64::from(self.disks_per_account);
        let mut running_total: u64 = 0;

        for (shard_index, account_name) in candidates.iter().enumerate() {
            running_total = running_total.saturating_add(increment);
            if effective <= running_total {
                return Ok(AllocationDecision {
                    shard_index,
                    account_name: account_name.clone(),
                    vm_count,
                });
            }
        }

        Err(CapacityExhausted {
            vm_count,
            capacity: running_total,
        })
    }
}

/// Generates `count` shard-qualified names for `base`, 1-based and
/// zero-padded to two digits.
#[must_use]
pub fn generate_candidates(base: &str, count: u32) -> Vec<AccountName> {
    (1..=count)
        .map(|index| AccountName::new(format!("{base}{index:02}")))
        .collect()
}

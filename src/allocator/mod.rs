//! Storage account allocation for new virtual machines.
//!
//! The allocator reads the VM count of a resource group, picks the shard that
//! should host the next OS disk, creates the storage account when its name is
//! still unclaimed, and blocks until Azure reports it as `Succeeded`.
//!
//! Reading the VM count and acting on it is not atomic. Two allocations
//! running against the same resource group at the same time can select the
//! same shard; callers must serialise provisioning per resource group.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::backend::{StorageAccountBackend, StorageAccountRequest};
use crate::naming::{DEFAULT_NAME_PREFIX, base_account_name};
use crate::shard::{AllocationDecision, ShardLayout};
use crate::sku::StorageSku;
use crate::types::{AccountName, Location, ResourceGroupName};

mod error;
mod wait;

pub use error::{AllocationError, PlanError};

/// Seconds between provisioning state queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Number of provisioning state queries before giving up.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 10;

/// Inputs identifying where the next virtual machine will be placed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllocationRequest {
    /// Opaque platform identifier of the compute instance.
    pub instance_id: String,
    /// Resource group that will hold the VM and its storage account.
    pub resource_group: ResourceGroupName,
    /// Azure region.
    pub location: Location,
    /// SKU used if a storage account has to be created.
    pub sku: StorageSku,
}

impl AllocationRequest {
    /// Creates a request with the default (standard) SKU.
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        resource_group: impl Into<ResourceGroupName>,
        location: impl Into<Location>,
    ) -> Self {
        Self {
            instance_id: instance_id.into().trim().to_owned(),
            resource_group: resource_group.into(),
            location: location.into(),
            sku: StorageSku::default(),
        }
    }

    /// Sets the SKU used for account creation.
    #[must_use]
    pub const fn sku(mut self, sku: StorageSku) -> Self {
        self.sku = sku;
        self
    }

    /// Sets the SKU from the VM size the disk is for.
    #[must_use]
    pub fn vm_size(self, vm_size: &str) -> Self {
        self.sku(StorageSku::for_vm_size(vm_size))
    }

    fn validate<E>(&self) -> Result<(), AllocationError<E>>
    where
        E: std::error::Error + 'static,
    {
        if self.instance_id.is_empty() {
            return Err(AllocationError::InvalidRequest(String::from("instance_id")));
        }
        if self.resource_group.is_empty() {
            return Err(AllocationError::InvalidRequest(String::from(
                "resource_group",
            )));
        }
        if self.location.is_empty() {
            return Err(AllocationError::InvalidRequest(String::from("location")));
        }
        Ok(())
    }
}

/// Fixed-interval polling policy for account readiness.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadinessPolicy {
    /// Pause between two queries.
    pub interval: Duration,
    /// Maximum number of queries.
    pub max_attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Resource group state observed at allocation time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceGroupContext {
    /// Resource group name.
    pub name: ResourceGroupName,
    /// Azure region.
    pub location: Location,
    /// Virtual machines currently in the group.
    pub vm_count: u64,
}

/// Result of a successful allocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllocationOutcome {
    /// Shard chosen for the VM.
    pub decision: AllocationDecision,
    /// Whether this allocation requested creation of the account.
    pub created: bool,
    /// Provisioning state queries needed before the account was ready.
    pub poll_attempts: u32,
}

impl AllocationOutcome {
    /// Account that will host the VM's OS disk.
    #[must_use]
    pub const fn account_name(&self) -> &AccountName {
        &self.decision.account_name
    }
}

/// Computes the shard for `vm_count` without any cloud calls.
///
/// # Errors
///
/// Returns [`PlanError`] when the name cannot be generated or all shards are
/// full.
pub fn plan(
    layout: &ShardLayout,
    name_prefix: &str,
    instance_id: &str,
    location: &Location,
    vm_count: u64,
) -> Result<AllocationDecision, PlanError> {
    let base = base_account_name(name_prefix, instance_id, location)?;
    let candidates = layout.candidates(&base);
    Ok(layout.select(&candidates, vm_count)?)
}

/// Chooses, creates, and waits for the storage account of a new VM.
#[derive(Clone, Debug)]
pub struct StorageAccountAllocator<B> {
    backend: B,
    layout: ShardLayout,
    readiness: ReadinessPolicy,
    name_prefix: String,
}

impl<B> StorageAccountAllocator<B>
where
    B: StorageAccountBackend,
{
    /// Creates an allocator using the default name prefix.
    #[must_use]
    pub fn new(backend: B, layout: ShardLayout, readiness: ReadinessPolicy) -> Self {
        Self {
            backend,
            layout,
            readiness,
            name_prefix: String::from(DEFAULT_NAME_PREFIX),
        }
    }

    /// Overrides the prefix of generated account names.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Reads the current VM count of the request's resource group.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::VmCount`] when the backend query fails.
    pub fn resource_group_context(
        &self,
        request: &AllocationRequest,
    ) -> Result<ResourceGroupContext, AllocationError<B::Error>> {
        let vm_count = self
            .backend
            .count_virtual_machines(&request.resource_group)
            .map_err(|source| AllocationError::VmCount {
                resource_group: request.resource_group.to_string(),
                source,
            })?;
        Ok(ResourceGroupContext {
            name: request.resource_group.clone(),
            location: request.location.clone(),
            vm_count,
        })
    }

    /// Runs the full allocation workflow and returns the ready account.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] when the request or readiness policy is
    /// unusable, naming fails, the VM count cannot be read, every shard is
    /// full, the availability check or creation fails, or the account is not
    /// ready within the polling budget.
    pub fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationOutcome, AllocationError<B::Error>> {
        request.validate::<B::Error>()?;
        if self.readiness.max_attempts == 0 {
            return Err(AllocationError::EmptyPollBudget);
        }

        let base = base_account_name(&self.name_prefix, &request.instance_id, &request.location)
            .map_err(AllocationError::Naming)?;
        info!(base_name = %base, "generated storage account name");
        let candidates = self.layout.candidates(&base);

        info!(resource_group = %request.resource_group, "getting resource group VM count");
        let context = self.resource_group_context(request)?;
        info!(vm_count = context.vm_count, "resource group VM count");

        let decision = self
            .layout
            .select(&candidates, context.vm_count)
            .map_err(|err| {
                error!(
                    resource_group = %context.name,
                    vm_count = err.vm_count,
                    capacity = err.capacity,
                    "no storage account can be selected"
                );
                AllocationError::CapacityExhausted(err)
            })?;
        info!(
            account = %decision.account_name,
            shard_index = decision.shard_index,
            "selected storage account"
        );

        let created = self.ensure_account(request, &decision.account_name)?;
        let poll_attempts = self.wait_until_ready(&request.resource_group, &decision.account_name)?;

        Ok(AllocationOutcome {
            decision,
            created,
            poll_attempts,
        })
    }

    /// Creates the account when its name is still unclaimed. Returns whether
    /// creation was requested.
    fn ensure_account(
        &self,
        request: &AllocationRequest,
        name: &AccountName,
    ) -> Result<bool, AllocationError<B::Error>> {
        let available = self.backend.check_name_available(name).map_err(|source| {
            warn!(account = %name, error = %source, "error checking storage account availability");
            AllocationError::Availability {
                name: name.clone(),
                source,
            }
        })?;
        info!(account = %name, available, "storage name availability");

        if !available {
            info!(account = %name, "no need to create storage account");
            return Ok(false);
        }

        info!(
            account = %name,
            resource_group = %request.resource_group,
            sku = %request.sku,
            "creating storage account"
        );
        let started = Instant::now();
        let account_request = StorageAccountRequest {
            name: name.clone(),
            resource_group: request.resource_group.clone(),
            location: request.location.clone(),
            sku: request.sku,
        };
        self.backend
            .create_storage_account(&account_request)
            .map_err(|source| AllocationError::Create {
                name: name.clone(),
                source,
            })?;
        info!(
            account = %name,
            elapsed_secs = started.elapsed().as_secs(),
            "storage account created"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests;

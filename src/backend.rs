//! Collaborator interfaces for the cloud operations the allocator needs.
//!
//! Each trait is deliberately narrow so that a different SDK binding can be
//! swapped in without touching the allocation algorithm.

use std::fmt;
use std::str::FromStr;

use crate::sku::StorageSku;
use crate::types::{AccountName, Location, ResourceGroupName};

/// Storage account kind requested on creation.
pub const STORAGE_KIND: &str = "Storage";

/// Parameters required to create a storage account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageAccountRequest {
    /// Globally unique account name.
    pub name: AccountName,
    /// Resource group that will own the account.
    pub resource_group: ResourceGroupName,
    /// Azure region of the account.
    pub location: Location,
    /// Replication and performance tier.
    pub sku: StorageSku,
}

/// Lifecycle status reported for a storage account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProvisioningState {
    /// The account is ready for use.
    Succeeded,
    /// The account is still being created.
    Creating,
    /// DNS for the account endpoints is being set up.
    ResolvingDns,
    /// Creation failed on the provider side.
    Failed,
    /// Any other value, kept verbatim.
    Other(String),
}

impl ProvisioningState {
    /// Returns `true` when the account can host disks.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Succeeded" => Self::Succeeded,
            "Creating" => Self::Creating,
            "ResolvingDNS" => Self::ResolvingDns,
            "Failed" => Self::Failed,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl FromStr for ProvisioningState {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value))
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Creating => f.write_str("Creating"),
            Self::ResolvingDns => f.write_str("ResolvingDNS"),
            Self::Failed => f.write_str("Failed"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// Read access to the virtual machines of a resource group.
pub trait ComputeInventory {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Counts the virtual machines currently placed in `resource_group`.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the listing fails.
    fn count_virtual_machines(&self, resource_group: &ResourceGroupName)
    -> Result<u64, Self::Error>;
}

/// Storage account operations used while allocating a shard.
pub trait StorageAccountBackend: ComputeInventory {
    /// Returns `true` when `name` is not yet claimed anywhere in Azure.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the availability check fails.
    fn check_name_available(&self, name: &AccountName) -> Result<bool, Self::Error>;

    /// Requests creation of a storage account.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the provider rejects the request or
    /// returns no account.
    fn create_storage_account(&self, request: &StorageAccountRequest) -> Result<(), Self::Error>;

    /// Reads the provisioning state of an account, or `None` when the
    /// account is not visible yet.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the lookup fails for any reason other
    /// than the account being absent.
    fn provisioning_state(
        &self,
        resource_group: &ResourceGroupName,
        name: &AccountName,
    ) -> Result<Option<ProvisioningState>, Self::Error>;
}

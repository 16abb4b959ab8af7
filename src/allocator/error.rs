//! Error types for the allocation workflow.

use thiserror::Error;

use crate::naming::NamingError;
use crate::shard::CapacityExhausted;
use crate::types::AccountName;

/// Errors raised while computing a shard without touching the cloud.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    /// Raised when the base account name cannot be generated.
    #[error(transparent)]
    Naming(#[from] NamingError),
    /// Raised when every shard is already full.
    #[error(transparent)]
    CapacityExhausted(#[from] CapacityExhausted),
}

/// Errors raised while allocating a storage account. Every variant is fatal
/// for the enclosing provisioning workflow; nothing is retried or rolled back.
#[derive(Debug, Error)]
pub enum AllocationError<BackendError>
where
    BackendError: std::error::Error + 'static,
{
    /// Raised when a required request field is blank.
    #[error("invalid allocation request: missing {0}")]
    InvalidRequest(String),
    /// Raised when the readiness policy allows no provisioning state query.
    #[error("readiness policy must allow at least one provisioning state query")]
    EmptyPollBudget,
    /// Raised when the base account name cannot be generated.
    #[error(transparent)]
    Naming(NamingError),
    /// Raised when the resource group VM count cannot be read.
    #[error("failed to count virtual machines in resource group {resource_group}: {source}")]
    VmCount {
        /// Resource group that was queried.
        resource_group: String,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when every shard is already full.
    #[error(transparent)]
    CapacityExhausted(CapacityExhausted),
    /// Raised when the name availability check fails.
    #[error("error checking availability of {name}: {source}")]
    Availability {
        /// Candidate account name.
        name: AccountName,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the provider rejects account creation.
    #[error("could not create storage account {name}: {source}")]
    Create {
        /// Account name requested.
        name: AccountName,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the provisioning state lookup fails.
    #[error("error getting properties of {name}: {source}")]
    Readiness {
        /// Account being polled.
        name: AccountName,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the account never reports `Succeeded`.
    #[error("timeout: storage account {name} not ready after {attempts} attempts")]
    Timeout {
        /// Account being polled.
        name: AccountName,
        /// Number of provisioning state queries made.
        attempts: u32,
    },
}

//! Core library for the Stowage storage account allocator.
//!
//! Azure limits the disk throughput of a single storage account, so the OS
//! disks of a resource group are spread over a fixed set of deterministically
//! named accounts. The crate generates those names, picks the shard for the
//! next VM from the group's VM count, and provisions the account through a
//! backend abstraction with an `az` CLI implementation.

pub mod allocator;
pub mod azure_cli;
pub mod backend;
pub mod command;
pub mod config;
pub mod logging;
pub mod naming;
pub mod profile;
pub mod shard;
pub mod sku;
pub mod test_support;
pub mod types;

pub use allocator::{
    AllocationError, AllocationOutcome, AllocationRequest, PlanError, ReadinessPolicy,
    ResourceGroupContext, StorageAccountAllocator, plan,
};
pub use azure_cli::{AzureCli, AzureCliConfig, AzureCliError};
pub use backend::{ComputeInventory, ProvisioningState, StorageAccountBackend, StorageAccountRequest};
pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, StowageConfig};
pub use naming::{NamingError, abbreviate_location, base_account_name};
pub use profile::{ImageReference, OsDisk, ProfileError, StorageProfile};
pub use shard::{AllocationDecision, CapacityExhausted, ShardError, ShardLayout, generate_candidates};
pub use sku::StorageSku;
pub use types::{AccountName, Location, ResourceGroupName};

//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::allocator::{
    AllocationRequest, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, ReadinessPolicy,
};
use crate::azure_cli::{AzureCliConfig, DEFAULT_AZ_BIN};
use crate::naming::DEFAULT_NAME_PREFIX;
use crate::shard::{DEFAULT_DISKS_PER_ACCOUNT, DEFAULT_RESOURCES_PER_GROUP, ShardLayout};
use crate::sku::StorageSku;

/// Default pause between provisioning state queries, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = DEFAULT_POLL_INTERVAL.as_secs();

/// Allocation settings derived from environment variables, configuration
/// files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "STOWAGE",
    discovery(
        app_name = "stowage",
        env_var = "STOWAGE_CONFIG_PATH",
        config_file_name = "stowage.toml",
        dotfile_name = ".stowage.toml",
        project_file_name = "stowage.toml"
    )
)]
pub struct StowageConfig {
    /// Resource group that holds the VMs and their storage accounts.
    #[ortho_config(default = String::new())]
    pub resource_group: String,
    /// Azure region of the resource group, for example `eastus`.
    #[ortho_config(default = String::new())]
    pub location: String,
    /// Subscription passed to every `az` call. Uses the CLI default when
    /// unset.
    pub subscription: Option<String>,
    /// Prefix of generated storage account names.
    #[ortho_config(default = DEFAULT_NAME_PREFIX.to_owned())]
    pub name_prefix: String,
    /// OS disks hosted by a single storage account.
    #[ortho_config(default = DEFAULT_DISKS_PER_ACCOUNT)]
    pub disks_per_account: u32,
    /// Maximum number of resources a resource group is planned for.
    #[ortho_config(default = DEFAULT_RESOURCES_PER_GROUP)]
    pub resources_per_group: u32,
    /// Seconds between provisioning state queries.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
    /// Provisioning state queries before the allocation times out.
    #[ortho_config(default = DEFAULT_MAX_POLL_ATTEMPTS)]
    pub max_poll_attempts: u32,
    /// Path to the `az` executable.
    #[ortho_config(default = DEFAULT_AZ_BIN.to_owned())]
    pub az_bin: String,
    /// VM size used to pick the SKU when a command does not name one.
    #[ortho_config(default = String::new())]
    pub default_vm_size: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to stowage.toml",
            self.env_var, self.toml_key
        )
    }
}

const RESOURCE_GROUP: FieldMetadata =
    FieldMetadata::new("resource group", "STOWAGE_RESOURCE_GROUP", "resource_group");
const LOCATION: FieldMetadata = FieldMetadata::new("Azure location", "STOWAGE_LOCATION", "location");
const NAME_PREFIX: FieldMetadata =
    FieldMetadata::new("account name prefix", "STOWAGE_NAME_PREFIX", "name_prefix");
const AZ_BIN: FieldMetadata = FieldMetadata::new("az executable", "STOWAGE_AZ_BIN", "az_bin");
const MAX_POLL_ATTEMPTS: FieldMetadata = FieldMetadata::new(
    "readiness attempt limit",
    "STOWAGE_MAX_POLL_ATTEMPTS",
    "max_poll_attempts",
);
const SHARD_LAYOUT: FieldMetadata = FieldMetadata::new(
    "shard layout",
    "STOWAGE_DISKS_PER_ACCOUNT",
    "disks_per_account",
);

impl StowageConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("stowage")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks the settings needed by the offline planning commands.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the prefix is blank or the shard layout is
    /// invalid.
    pub fn validate_layout(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.name_prefix, &NAME_PREFIX)?;
        self.shard_layout().map(|_| ())
    }

    /// Performs semantic validation of everything `allocate` needs. Error
    /// messages name the environment variable and TOML key to set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when a numeric setting is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.resource_group, &RESOURCE_GROUP)?;
        Self::require_field(&self.location, &LOCATION)?;
        Self::require_field(&self.az_bin, &AZ_BIN)?;
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be at least 1: {}",
                MAX_POLL_ATTEMPTS.description,
                MAX_POLL_ATTEMPTS.hint()
            )));
        }
        self.validate_layout()
    }

    /// Builds the shard layout from the capacity settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the settings yield no shards or
    /// more shards than two-digit suffixes allow.
    pub fn shard_layout(&self) -> Result<ShardLayout, ConfigError> {
        ShardLayout::new(self.disks_per_account, self.resources_per_group).map_err(|err| {
            ConfigError::Invalid(format!(
                "{}: {err}; {} and STOWAGE_RESOURCES_PER_GROUP",
                SHARD_LAYOUT.description,
                SHARD_LAYOUT.hint()
            ))
        })
    }

    /// Readiness polling policy built from the configured interval and limit.
    #[must_use]
    pub const fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            interval: std::time::Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
        }
    }

    /// Settings for the `az` backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when `az_bin` is blank.
    pub fn azure_cli_config(&self) -> Result<AzureCliConfig, ConfigError> {
        Self::require_field(&self.az_bin, &AZ_BIN)?;
        AzureCliConfig::new(&self.az_bin, self.subscription.clone())
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Builds an allocation request for `instance_id` in the configured
    /// resource group. The SKU follows `vm_size`, falling back to
    /// `default_vm_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn request(
        &self,
        instance_id: &str,
        vm_size: Option<&str>,
    ) -> Result<AllocationRequest, ConfigError> {
        self.validate()?;
        let size = vm_size.unwrap_or(&self.default_vm_size);
        Ok(
            AllocationRequest::new(instance_id, self.resource_group.as_str(), self.location.as_str())
                .sku(StorageSku::for_vm_size(size)),
        )
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds a value the allocator cannot use.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

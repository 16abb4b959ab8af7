//! Storage backend that drives the Azure CLI.
//!
//! Every operation shells out to `az ... -o json` through a
//! [`CommandRunner`] and parses the JSON printed on stdout. Authentication is
//! whatever `az login` (or a managed identity) has already established.

use std::ffi::OsString;

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;
use tracing::debug;

use crate::backend::{
    ComputeInventory, ProvisioningState, STORAGE_KIND, StorageAccountBackend,
    StorageAccountRequest,
};
use crate::command::{
    CommandError, CommandOutput, CommandRunner, ProcessCommandRunner, render_command,
};
use crate::types::{AccountName, ResourceGroupName};

/// Default Azure CLI binary name.
pub const DEFAULT_AZ_BIN: &str = "az";

const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFound",
    "StorageAccountNotFound",
    "was not found",
];

/// Settings for the Azure CLI backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AzureCliConfig {
    /// Path to the `az` binary.
    pub az_bin: String,
    /// Subscription passed as `--subscription`, when set.
    pub subscription: Option<String>,
}

impl AzureCliConfig {
    /// Constructs a config, trimming whitespace and dropping a blank
    /// subscription.
    ///
    /// # Errors
    ///
    /// Returns [`AzureCliError::InvalidConfig`] when `az_bin` is blank.
    pub fn new(
        az_bin: impl Into<String>,
        subscription: Option<String>,
    ) -> Result<Self, AzureCliError> {
        let trimmed_bin = az_bin.into().trim().to_owned();
        if trimmed_bin.is_empty() {
            return Err(AzureCliError::InvalidConfig {
                field: String::from("az_bin"),
            });
        }
        Ok(Self {
            az_bin: trimmed_bin,
            subscription: subscription
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
        })
    }
}

impl Default for AzureCliConfig {
    fn default() -> Self {
        Self {
            az_bin: String::from(DEFAULT_AZ_BIN),
            subscription: None,
        }
    }
}

/// Errors raised by the Azure CLI backend.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AzureCliError {
    /// Raised when configuration is missing required values.
    #[error("missing {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when `az` cannot be started.
    #[error(transparent)]
    Runner(#[from] CommandError),
    /// Raised when `az` returns a non-zero exit status.
    #[error("{command} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Rendered command line.
        command: String,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `vm list`).
        resource: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a command that must describe a resource prints nothing.
    #[error("{command} returned no storage account")]
    EmptyResponse {
        /// Rendered command line.
        command: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameAvailability {
    name_available: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

/// Storage backend implemented on top of the `az` CLI.
#[derive(Clone, Debug)]
pub struct AzureCli<R: CommandRunner> {
    config: AzureCliConfig,
    runner: R,
}

impl AzureCli<ProcessCommandRunner> {
    /// Creates a backend wired to the real process runner.
    #[must_use]
    pub const fn with_process_runner(config: AzureCliConfig) -> Self {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> AzureCli<R> {
    /// Creates a backend using the provided configuration and runner.
    #[must_use]
    pub const fn new(config: AzureCliConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Builds an argument vector: the subcommand path, its arguments, JSON
    /// output, and the subscription when configured.
    fn build_args(&self, subcommand_path: &[&str], options: &[(&str, &str)]) -> Vec<OsString> {
        let mut args: Vec<OsString> = subcommand_path.iter().map(OsString::from).collect();
        for (flag, value) in options {
            args.push(OsString::from(*flag));
            args.push(OsString::from(*value));
        }
        if let Some(subscription) = &self.config.subscription {
            args.push(OsString::from("--subscription"));
            args.push(OsString::from(subscription));
        }
        args.push(OsString::from("-o"));
        args.push(OsString::from("json"));
        args
    }

    fn run_az(&self, args: &[OsString]) -> Result<CommandOutput, AzureCliError> {
        debug!(command = %render_command(&self.config.az_bin, args), "running az");
        Ok(self.runner.run(&self.config.az_bin, args)?)
    }

    fn check_output(&self, args: &[OsString], output: CommandOutput) -> Result<String, AzureCliError> {
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(AzureCliError::CommandFailure {
            command: render_command(&self.config.az_bin, args),
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }

    fn run_az_json<T>(&self, args: &[OsString], resource: &str) -> Result<T, AzureCliError>
    where
        T: DeserializeOwned,
    {
        let output = self.run_az(args)?;
        let stdout = self.check_output(args, output)?;
        parse_json(&stdout, resource)
    }
}

fn parse_json<T>(stdout: &str, resource: &str) -> Result<T, AzureCliError>
where
    T: DeserializeOwned,
{
    serde_json::from_str::<T>(stdout).map_err(|err| AzureCliError::Parse {
        resource: resource.to_owned(),
        message: err.to_string(),
    })
}

fn is_not_found(output: &CommandOutput) -> bool {
    !output.is_success()
        && NOT_FOUND_MARKERS
            .iter()
            .any(|marker| output.stderr.contains(marker))
}

impl<R: CommandRunner> ComputeInventory for AzureCli<R> {
    type Error = AzureCliError;

    fn count_virtual_machines(
        &self,
        resource_group: &ResourceGroupName,
    ) -> Result<u64, Self::Error> {
        let args = self.build_args(&["vm", "list"], &[("--resource-group", resource_group.as_str())]);
        let output = self.run_az(&args)?;
        let stdout = self.check_output(&args, output)?;
        if stdout.trim().is_empty() {
            return Ok(0);
        }
        let vms: Option<Vec<IgnoredAny>> = parse_json(&stdout, "vm list")?;
        let count = vms.map_or(0, |list| list.len());
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

impl<R: CommandRunner> StorageAccountBackend for AzureCli<R> {
    fn check_name_available(&self, name: &AccountName) -> Result<bool, Self::Error> {
        let args = self.build_args(&["storage", "account", "check-name"], &[("--name", name.as_str())]);
        let response: NameAvailability = self.run_az_json(&args, "storage account check-name")?;
        Ok(response.name_available)
    }

    fn create_storage_account(&self, request: &StorageAccountRequest) -> Result<(), Self::Error> {
        let args = self.build_args(
            &["storage", "account", "create"],
            &[
                ("--name", request.name.as_str()),
                ("--resource-group", request.resource_group.as_str()),
                ("--location", request.location.as_str()),
                ("--sku", request.sku.name()),
                ("--kind", STORAGE_KIND),
            ],
        );
        let output = self.run_az(&args)?;
        let stdout = self.check_output(&args, output)?;
        let empty = || AzureCliError::EmptyResponse {
            command: render_command(&self.config.az_bin, &args),
        };
        if stdout.trim().is_empty() {
            return Err(empty());
        }
        let parsed: Option<AccountProperties> = parse_json(&stdout, "storage account create")?;
        let created = parsed.ok_or_else(empty)?;
        debug!(
            account = %request.name,
            state = created.provisioning_state.as_deref().unwrap_or("unknown"),
            "storage account create accepted"
        );
        Ok(())
    }

    fn provisioning_state(
        &self,
        resource_group: &ResourceGroupName,
        name: &AccountName,
    ) -> Result<Option<ProvisioningState>, Self::Error> {
        let args = self.build_args(
            &["storage", "account", "show"],
            &[
                ("--name", name.as_str()),
                ("--resource-group", resource_group.as_str()),
            ],
        );
        let output = self.run_az(&args)?;
        if is_not_found(&output) {
            debug!(account = %name, "storage account not found");
            return Ok(None);
        }
        let stdout = self.check_output(&args, output)?;
        let account: AccountProperties = parse_json(&stdout, "storage account show")?;
        Ok(account.provisioning_state.as_deref().map(ProvisioningState::from))
    }
}

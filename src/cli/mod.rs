//! Command-line interface definitions for the `stowage` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `stowage` binary.
#[derive(Debug, Parser)]
#[command(
    name = "stowage",
    about = "Pick and provision the Azure storage account for a new VM disk",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Print every candidate storage account name.
    #[command(name = "candidates", about = "Print every candidate storage account name")]
    Candidates(NamingArgs),
    /// Compute the shard for a VM count without calling Azure.
    #[command(
        name = "select",
        about = "Compute the shard for a VM count without calling Azure"
    )]
    Select(SelectCommand),
    /// Select, create, and wait for the storage account of a new VM.
    #[command(
        name = "allocate",
        about = "Select, create, and wait for the storage account of a new VM"
    )]
    Allocate(AllocateCommand),
    /// Print the ARM storage profile for a VM as JSON.
    #[command(name = "profile", about = "Print the ARM storage profile for a VM as JSON")]
    Profile(ProfileCommand),
}

/// Inputs that determine the generated account names.
#[derive(Debug, Parser)]
pub(crate) struct NamingArgs {
    /// Platform identifier of the compute instance.
    #[arg(long, value_name = "ID")]
    pub(crate) instance_id: String,
    /// Azure region, for example `eastus`.
    #[arg(long, value_name = "LOCATION")]
    pub(crate) location: String,
    /// Override the configured account name prefix.
    #[arg(long, value_name = "PREFIX")]
    pub(crate) name_prefix: Option<String>,
}

/// Arguments for the `stowage select` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SelectCommand {
    #[command(flatten)]
    pub(crate) naming: NamingArgs,
    /// Virtual machines already in the resource group.
    #[arg(long, value_name = "COUNT")]
    pub(crate) vm_count: u64,
}

/// Arguments for the `stowage allocate` subcommand.
///
/// Resource group, location, and subscription come from configuration
/// (`STOWAGE_*` variables or `stowage.toml`).
#[derive(Debug, Parser)]
pub(crate) struct AllocateCommand {
    /// Platform identifier of the compute instance.
    #[arg(long, value_name = "ID")]
    pub(crate) instance_id: String,
    /// VM size used to choose between standard and premium storage.
    #[arg(long, value_name = "SIZE")]
    pub(crate) vm_size: Option<String>,
}

/// Arguments for the `stowage profile` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ProfileCommand {
    /// Image in `publisher:offer:sku:version` form.
    #[arg(long, value_name = "IMAGE")]
    pub(crate) image_id: String,
    /// Storage account hosting the OS disk.
    #[arg(long, value_name = "ACCOUNT")]
    pub(crate) account: String,
    /// Server name used for the disk and blob names.
    #[arg(long, value_name = "NAME")]
    pub(crate) server_name: String,
}

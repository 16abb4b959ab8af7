//! Binary entry point for the Stowage CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use stowage::{
    AccountName, AllocationError, AzureCli, AzureCliError, ConfigError, Location, PlanError,
    ProfileError, StorageAccountAllocator, StorageProfile, StowageConfig, base_account_name,
    logging, plan,
};

mod cli;

use cli::{AllocateCommand, Cli, NamingArgs, ProfileCommand, SelectCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Allocation(#[from] AllocationError<AzureCliError>),
    #[error("invalid storage profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Output(value.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value.to_string())
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli, &mut io::stdout().lock()) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    match cli {
        Cli::Candidates(args) => print_candidates(&args, out),
        Cli::Select(command) => print_selection(&command, out),
        Cli::Allocate(command) => allocate(&command, out),
        Cli::Profile(command) => print_profile(&command, out),
    }
}

/// Loads configuration for the offline commands and applies the prefix
/// override. Returns the config and the effective prefix.
fn planning_config(args: &NamingArgs) -> Result<(StowageConfig, String), CliError> {
    let mut config = StowageConfig::load_without_cli_args()?;
    if let Some(prefix) = &args.name_prefix {
        config.name_prefix.clone_from(prefix);
    }
    config.validate_layout()?;
    let prefix = config.name_prefix.clone();
    Ok((config, prefix))
}

fn print_candidates(args: &NamingArgs, out: &mut impl Write) -> Result<(), CliError> {
    let (config, prefix) = planning_config(args)?;
    let layout = config.shard_layout()?;
    let base = base_account_name(&prefix, &args.instance_id, &Location::from(args.location.as_str()))
        .map_err(PlanError::from)?;
    for name in layout.candidates(&base) {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn print_selection(command: &SelectCommand, out: &mut impl Write) -> Result<(), CliError> {
    let (config, prefix) = planning_config(&command.naming)?;
    let decision = plan(
        &config.shard_layout()?,
        &prefix,
        &command.naming.instance_id,
        &Location::from(command.naming.location.as_str()),
        command.vm_count,
    )?;
    writeln!(out, "{}\t{}", decision.shard_index, decision.account_name)?;
    Ok(())
}

fn allocate(command: &AllocateCommand, out: &mut impl Write) -> Result<(), CliError> {
    let config = StowageConfig::load_without_cli_args()?;
    let request = config.request(&command.instance_id, command.vm_size.as_deref())?;
    let backend = AzureCli::with_process_runner(config.azure_cli_config()?);
    let allocator =
        StorageAccountAllocator::new(backend, config.shard_layout()?, config.readiness_policy())
            .with_name_prefix(config.name_prefix.as_str());
    let outcome = allocator.allocate(&request)?;
    writeln!(out, "{}", outcome.account_name())?;
    Ok(())
}

fn print_profile(command: &ProfileCommand, out: &mut impl Write) -> Result<(), CliError> {
    let account = AccountName::from(command.account.as_str());
    let profile = StorageProfile::build(&command.image_id, &account, &command.server_name)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&profile)?)?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

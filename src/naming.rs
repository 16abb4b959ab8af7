//! Storage account base-name generation.
//!
//! Azure storage account names must be lowercase alphanumeric and between 3
//! and 24 characters long. The base name produced here is capped at
//! [`MAX_BASE_NAME_LEN`] characters so that a two-digit shard suffix can be
//! appended without breaking that rule.
//!
//! Truncation is lossy: two instance identifiers that share the same first
//! characters after the prefix map to the same base name once the combined
//! string exceeds the cap.

use thiserror::Error;
use tracing::debug;

use crate::types::Location;

/// Prefix applied to every generated storage account name.
pub const DEFAULT_NAME_PREFIX: &str = "oostg";

/// Maximum length of a base name before the shard suffix is appended.
pub const MAX_BASE_NAME_LEN: usize = 22;

/// Errors raised while generating account names.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NamingError {
    /// Raised when nothing usable remains after sanitising the inputs.
    #[error("storage account name for instance '{instance_id}' is empty after sanitising")]
    Empty {
        /// Instance identifier supplied by the caller.
        instance_id: String,
    },
}

const LOCATION_ABBREVIATIONS: &[(&str, &str)] = &[
    ("australiaeast", "aue"),
    ("australiasoutheast", "ause"),
    ("brazilsouth", "brs"),
    ("canadacentral", "cac"),
    ("canadaeast", "cae"),
    ("centralindia", "cin"),
    ("centralus", "cus"),
    ("eastasia", "eas"),
    ("eastus", "eus"),
    ("eastus2", "eus2"),
    ("japaneast", "jpe"),
    ("japanwest", "jpw"),
    ("koreacentral", "krc"),
    ("koreasouth", "krs"),
    ("northcentralus", "ncus"),
    ("northeurope", "neu"),
    ("southcentralus", "scus"),
    ("southeastasia", "seas"),
    ("southindia", "sin"),
    ("uksouth", "uks"),
    ("ukwest", "ukw"),
    ("westcentralus", "wcus"),
    ("westeurope", "weu"),
    ("westindia", "win"),
    ("westus", "wus"),
    ("westus2", "wus2"),
];

/// Returns the short code for an Azure region.
///
/// Unknown regions fall back to the sanitised region name so callers still
/// get a deterministic, legal fragment.
#[must_use]
pub fn abbreviate_location(location: &Location) -> String {
    let normalised = sanitise(location.as_str());
    LOCATION_ABBREVIATIONS
        .iter()
        .find(|(region, _)| *region == normalised)
        .map(|(_, short)| (*short).to_owned())
        .unwrap_or(normalised)
}

/// Builds the base storage account name for an instance in a location.
///
/// The result is `prefix + instance_id + abbreviate_location(location)`,
/// reduced to lowercase ASCII alphanumerics and cut to the first
/// [`MAX_BASE_NAME_LEN`] characters.
///
/// # Errors
///
/// Returns [`NamingError::Empty`] when the sanitised name is empty.
pub fn base_account_name(
    prefix: &str,
    instance_id: &str,
    location: &Location,
) -> Result<String, NamingError> {
    let raw = format!(
        "{}{}{}",
        sanitise(prefix),
        sanitise(instance_id),
        abbreviate_location(location)
    );
    if raw.is_empty() {
        return Err(NamingError::Empty {
            instance_id: instance_id.to_owned(),
        });
    }

    let name: String = raw.chars().take(MAX_BASE_NAME_LEN).collect();
    if name.len() < raw.len() {
        debug!(%raw, truncated = %name, "base storage account name truncated");
    }
    Ok(name)
}

fn sanitise(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

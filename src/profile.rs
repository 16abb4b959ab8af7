//! Storage profile pieces for a VM whose OS disk lives in a sharded account.
//!
//! The serialised form follows the ARM `storageProfile` shape so callers can
//! splice it into a VM deployment body.

use serde::Serialize;
use thiserror::Error;

use crate::types::AccountName;

const BLOB_HOST_SUFFIX: &str = "blob.core.windows.net";
const VHD_CONTAINER: &str = "vhds";

/// Errors raised while building storage profile values.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProfileError {
    /// Raised when an image id is not `Publisher:Offer:Sku:Version`.
    #[error("image id '{0}' must have the form Publisher:Offer:Sku:Version")]
    MalformedImageId(String),
    /// Raised when the server name is blank.
    #[error("server name must not be empty")]
    EmptyServerName,
}

/// Marketplace image used for the OS disk.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ImageReference {
    /// Image publisher, for example `OpenLogic`.
    pub publisher: String,
    /// Image offer, for example `CentOS`.
    pub offer: String,
    /// Image SKU, for example `7.2`.
    pub sku: String,
    /// Image version, usually `latest`.
    pub version: String,
}

impl ImageReference {
    /// Parses `Publisher:Offer:Sku:Version`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::MalformedImageId`] when the id does not have
    /// exactly four non-empty fields.
    pub fn parse(image_id: &str) -> Result<Self, ProfileError> {
        let malformed = || ProfileError::MalformedImageId(image_id.to_owned());
        let mut parts = image_id.trim().split(':').map(str::trim);
        let (Some(publisher), Some(offer), Some(sku), Some(version), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed());
        };
        if [publisher, offer, sku, version].iter().any(|part| part.is_empty()) {
            return Err(malformed());
        }
        Ok(Self {
            publisher: publisher.to_owned(),
            offer: offer.to_owned(),
            sku: sku.to_owned(),
            version: version.to_owned(),
        })
    }

    /// Short label reported back to the platform (`offer-version`).
    #[must_use]
    pub fn version_label(&self) -> String {
        format!("{}-{}", self.offer, self.version)
    }
}

/// Caching mode of a disk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Caching {
    /// Read and write caching.
    ReadWrite,
    /// Read-only caching.
    ReadOnly,
    /// No caching.
    None,
}

/// How the disk is initialised.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CreateOption {
    /// Copy the marketplace image.
    FromImage,
    /// Create an empty disk.
    Empty,
    /// Attach an existing VHD.
    Attach,
}

/// Reference to a VHD blob.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VirtualHardDisk {
    /// Blob URL of the VHD.
    pub uri: String,
}

/// OS disk placed in a sharded storage account.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    /// Disk name (`<server>-disk`).
    pub name: String,
    /// Backing VHD blob.
    pub vhd: VirtualHardDisk,
    /// Caching mode.
    pub caching: Caching,
    /// Initialisation mode.
    pub create_option: CreateOption,
}

impl OsDisk {
    /// Builds the OS disk for `server_name` in `account`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::EmptyServerName`] when `server_name` is blank.
    pub fn from_image(account: &AccountName, server_name: &str) -> Result<Self, ProfileError> {
        let server = server_name.trim();
        if server.is_empty() {
            return Err(ProfileError::EmptyServerName);
        }
        Ok(Self {
            name: format!("{server}-disk"),
            vhd: VirtualHardDisk {
                uri: vhd_uri(account, server),
            },
            caching: Caching::ReadWrite,
            create_option: CreateOption::FromImage,
        })
    }
}

/// Storage section of a VM definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    /// Marketplace image.
    pub image_reference: ImageReference,
    /// OS disk.
    pub os_disk: OsDisk,
}

impl StorageProfile {
    /// Builds a profile from an image id, the selected account, and the server name.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] when the image id or server name is invalid.
    pub fn build(
        image_id: &str,
        account: &AccountName,
        server_name: &str,
    ) -> Result<Self, ProfileError> {
        Ok(Self {
            image_reference: ImageReference::parse(image_id)?,
            os_disk: OsDisk::from_image(account, server_name)?,
        })
    }
}

/// Blob URL for a data disk of `component` on device `device`.
#[must_use]
pub fn data_disk_vhd_uri(account: &AccountName, component: &str, device: &str) -> String {
    vhd_uri(account, &format!("{component}-datadisk-{device}"))
}

/// Extracts the storage account name from a VHD blob URL.
#[must_use]
pub fn account_from_vhd_uri(uri: &str) -> Option<AccountName> {
    let (_, rest) = uri.trim().split_once("://")?;
    let host = rest.split('/').next()?;
    let (account, suffix) = host.split_once('.')?;
    if account.is_empty() || suffix != BLOB_HOST_SUFFIX {
        return None;
    }
    Some(AccountName::new(account))
}

fn vhd_uri(account: &AccountName, blob_stem: &str) -> String {
    format!("https://{account}.{BLOB_HOST_SUFFIX}/{VHD_CONTAINER}/{account}-{blob_stem}.vhd")
}

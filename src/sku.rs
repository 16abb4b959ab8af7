//! Storage SKU selection for new storage accounts.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Replication and performance tier of a storage account.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StorageSku {
    /// Locally redundant standard (HDD-backed) storage.
    #[default]
    StandardLrs,
    /// Locally redundant premium (SSD-backed) storage.
    PremiumLrs,
}

/// Raised when a SKU name is not recognised.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown storage SKU '{0}' (expected Standard_LRS or Premium_LRS)")]
pub struct UnknownSku(pub String);

impl StorageSku {
    /// Picks the SKU matching a VM size.
    ///
    /// DS and GS series sizes support premium storage and get
    /// [`StorageSku::PremiumLrs`]; every other size gets standard storage.
    #[must_use]
    pub fn for_vm_size(vm_size: &str) -> Self {
        if vm_size.contains("DS") || vm_size.contains("GS") {
            Self::PremiumLrs
        } else {
            Self::StandardLrs
        }
    }

    /// Azure SKU name, as accepted by `--sku`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StandardLrs => "Standard_LRS",
            Self::PremiumLrs => "Premium_LRS",
        }
    }

    /// Azure SKU tier.
    #[must_use]
    pub const fn tier(self) -> &'static str {
        match self {
            Self::StandardLrs => "Standard",
            Self::PremiumLrs => "Premium",
        }
    }
}

impl fmt::Display for StorageSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageSku {
    type Err = UnknownSku;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard_lrs" => Ok(Self::StandardLrs),
            "premium_lrs" => Ok(Self::PremiumLrs),
            _ => Err(UnknownSku(value.to_owned())),
        }
    }
}

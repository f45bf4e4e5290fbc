//! Device-side records: installed apps and per-app user extras.

use super::{ensure_package_name, ModelValidationError};
use serde::{Deserialize, Serialize};

/// An app present on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installed {
    pub package_name: String,
    pub version: String,
    pub version_code: i64,
    /// Signing-certificate hash of the installed package.
    pub signature: String,
    pub is_system: bool,
}

impl Installed {
    pub fn new(
        package_name: impl Into<String>,
        version: impl Into<String>,
        version_code: i64,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            version: version.into(),
            version_code,
            signature: String::new(),
            is_system: false,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_package_name(&self.package_name)
    }
}

/// User-specific flags for one package. Independent of any repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    pub package_name: String,
    pub favorite: bool,
    pub ignore_updates: bool,
    pub ignore_vulns: bool,
    /// Version code the user chose to skip. `0` when none.
    pub ignored_version: i64,
}

impl Extras {
    /// Extras with every flag cleared.
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            favorite: false,
            ignore_updates: false,
            ignore_vulns: false,
            ignored_version: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_package_name(&self.package_name)
    }
}

//! Release (downloadable app version) model.

use super::repository::RepositoryId;
use super::{ensure_package_name, ModelValidationError};
use serde::{Deserialize, Serialize};

/// One downloadable build of a product.
///
/// Identified by `(repository_id, package_name, version_code, signature)`:
/// the same version code may ship under several signing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub repository_id: RepositoryId,
    pub package_name: String,
    pub version: String,
    pub version_code: i64,
    pub added: i64,
    /// Download size in bytes.
    pub size: i64,
    pub min_sdk_version: i64,
    pub target_sdk_version: i64,
    /// `0` when the release sets no upper bound.
    pub max_sdk_version: i64,
    /// File name relative to the repository address.
    pub file_name: String,
    pub hash: String,
    pub hash_type: String,
    pub signature: String,
    pub permissions: Vec<String>,
    pub features: Vec<String>,
    /// Supported ABIs. Empty means any.
    pub platforms: Vec<String>,
    /// Reasons the release cannot be installed on this device.
    pub incompatibilities: Vec<String>,
}

impl Release {
    pub fn new(
        repository_id: RepositoryId,
        package_name: impl Into<String>,
        version: impl Into<String>,
        version_code: i64,
    ) -> Self {
        Self {
            repository_id,
            package_name: package_name.into(),
            version: version.into(),
            version_code,
            added: 0,
            size: 0,
            min_sdk_version: 0,
            target_sdk_version: 0,
            max_sdk_version: 0,
            file_name: String::new(),
            hash: String::new(),
            hash_type: String::new(),
            signature: String::new(),
            permissions: Vec::new(),
            features: Vec::new(),
            platforms: Vec::new(),
            incompatibilities: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_package_name(&self.package_name)
    }

    pub fn is_compatible(&self) -> bool {
        self.incompatibilities.is_empty()
    }
}

//! Product (catalog app entry) and category models.
//!
//! # Invariants
//! - A product is identified by `(repository_id, package_name)`; the same
//!   package may be listed by several repositories.
//! - Live and temporary tables share this exact shape.

use super::installed::{Extras, Installed};
use super::repository::RepositoryId;
use super::{ensure_package_name, ModelValidationError};
use serde::{Deserialize, Serialize};

/// One app as described by one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub repository_id: RepositoryId,
    pub package_name: String,
    pub label: String,
    pub summary: String,
    pub description: String,
    /// Epoch ms when the app first appeared in the repository.
    pub added: i64,
    /// Epoch ms of the latest catalog change.
    pub updated: i64,
    /// Display name of the newest release.
    pub version: String,
    /// Version code of the newest release.
    pub version_code: i64,
    /// Version code the repository recommends. `0` when unset.
    pub suggested_version_code: i64,
    pub icon: String,
    pub metadata_icon: String,
    pub author: String,
    pub source: String,
    pub web: String,
    pub licenses: Vec<String>,
    pub screenshots: Vec<String>,
    /// Signing-certificate hashes of the available releases.
    pub signatures: Vec<String>,
    /// Whether at least one release runs on this device.
    pub compatible: bool,
}

impl Product {
    /// Creates a product with empty metadata.
    pub fn new(
        repository_id: RepositoryId,
        package_name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            repository_id,
            package_name: package_name.into(),
            label: label.into(),
            summary: String::new(),
            description: String::new(),
            added: 0,
            updated: 0,
            version: String::new(),
            version_code: 0,
            suggested_version_code: 0,
            icon: String::new(),
            metadata_icon: String::new(),
            author: String::new(),
            source: String::new(),
            web: String::new(),
            licenses: Vec::new(),
            screenshots: Vec::new(),
            signatures: Vec::new(),
            compatible: true,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_package_name(&self.package_name)
    }

    /// Version code offered as an update: the suggested one when set,
    /// otherwise the newest.
    pub fn target_version_code(&self) -> i64 {
        if self.suggested_version_code > 0 {
            self.suggested_version_code
        } else {
            self.version_code
        }
    }

    /// Whether this product offers an update for `installed`.
    ///
    /// Mirrors the SQL used by update listings.
    pub fn can_update(&self, installed: Option<&Installed>, extras: Option<&Extras>) -> bool {
        let Some(installed) = installed else {
            return false;
        };
        let target = self.target_version_code();
        if !self.compatible || target <= installed.version_code {
            return false;
        }
        match extras {
            Some(extras) => !extras.ignore_updates && extras.ignored_version != target,
            None => true,
        }
    }
}

/// Category membership of one product in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub repository_id: RepositoryId,
    pub package_name: String,
    pub label: String,
}

impl Category {
    pub fn new(
        repository_id: RepositoryId,
        package_name: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            repository_id,
            package_name: package_name.into(),
            label: label.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_package_name(&self.package_name)?;
        if self.label.trim().is_empty() {
            return Err(ModelValidationError::BlankCategoryLabel);
        }
        Ok(())
    }
}

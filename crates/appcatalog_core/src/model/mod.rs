//! Catalog and device-state domain model.
//!
//! # Responsibility
//! - Define the records persisted by the catalog database.
//! - Keep write-side validation next to the data it guards.
//!
//! # Invariants
//! - Timestamps are Unix epoch milliseconds.
//! - Every record keyed by package name rejects a blank one.

pub mod installed;
pub mod product;
pub mod release;
pub mod repository;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure raised before a record is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// `package_name` is empty or whitespace.
    BlankPackageName,
    /// Repository `address` is empty or whitespace.
    BlankRepositoryAddress,
    /// Repository fingerprint is not a SHA-256 hex digest.
    InvalidFingerprint(String),
    /// Operation needs a persisted repository but `id` is unset.
    MissingRepositoryId,
    /// Category label is empty or whitespace.
    BlankCategoryLabel,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankPackageName => write!(f, "package name cannot be blank"),
            Self::BlankRepositoryAddress => write!(f, "repository address cannot be blank"),
            Self::InvalidFingerprint(value) => write!(
                f,
                "repository fingerprint `{value}` is not a 64 character hex digest"
            ),
            Self::MissingRepositoryId => write!(f, "repository has not been persisted yet"),
            Self::BlankCategoryLabel => write!(f, "category label cannot be blank"),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn ensure_package_name(package_name: &str) -> Result<(), ModelValidationError> {
    if package_name.trim().is_empty() {
        return Err(ModelValidationError::BlankPackageName);
    }
    Ok(())
}

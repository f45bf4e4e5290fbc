//! Repository (remote catalog source) model.
//!
//! # Invariants
//! - `id` is `None` until SQLite assigns one on first insert.
//! - A removed repository is first tombstoned (`deleted`, not `enabled`) and
//!   only dropped by the clean-up pass.

use super::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Row id of a repository.
pub type RepositoryId = i64;

static FINGERPRINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-F]{64}$").expect("valid fingerprint regex"));
static FINGERPRINT_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s:]+").expect("valid fingerprint separator regex"));

/// Remote app-catalog source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: Option<RepositoryId>,
    /// Base URL of the catalog.
    pub address: String,
    /// Alternative base URLs serving the same catalog.
    pub mirrors: Vec<String>,
    pub name: String,
    pub description: String,
    /// Catalog format version announced by the index.
    pub version: i64,
    pub enabled: bool,
    /// SHA-256 hex of the signing certificate, stored normalized. Empty when
    /// unknown.
    pub fingerprint: String,
    /// `Last-Modified` header of the last fetched index.
    pub last_modified: String,
    /// `ETag` header of the last fetched index.
    pub entity_tag: String,
    /// Epoch ms of the last successful sync.
    pub updated: i64,
    /// Index timestamp, epoch ms.
    pub timestamp: i64,
    /// Basic-auth credentials blob. Empty when none.
    pub authentication: String,
    pub deleted: bool,
}

impl Repository {
    /// Creates an unsaved, disabled repository for `address`.
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            address: address.into(),
            mirrors: Vec::new(),
            name: name.into(),
            description: String::new(),
            version: 0,
            enabled: false,
            fingerprint: String::new(),
            last_modified: String::new(),
            entity_tag: String::new(),
            updated: 0,
            timestamp: 0,
            authentication: String::new(),
            deleted: false,
        }
    }

    /// Checks write-side invariants.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.address.trim().is_empty() {
            return Err(ModelValidationError::BlankRepositoryAddress);
        }
        if !self.fingerprint.is_empty()
            && !FINGERPRINT_RE.is_match(&normalize_fingerprint(&self.fingerprint))
        {
            return Err(ModelValidationError::InvalidFingerprint(
                self.fingerprint.clone(),
            ));
        }
        Ok(())
    }

    /// Returns the persisted id or fails for unsaved records.
    pub fn require_id(&self) -> Result<RepositoryId, ModelValidationError> {
        self.id.ok_or(ModelValidationError::MissingRepositoryId)
    }

    /// Forgets sync metadata so the next sync fetches the full index.
    pub fn reset_sync_state(&mut self) {
        self.last_modified.clear();
        self.entity_tag.clear();
        self.updated = 0;
        self.timestamp = 0;
    }
}

/// Normalizes user-entered fingerprints: drops whitespace and `:`
/// separators and upper-cases the rest.
pub fn normalize_fingerprint(value: &str) -> String {
    FINGERPRINT_SEPARATOR_RE
        .replace_all(value, "")
        .to_ascii_uppercase()
}

/// Built-in repositories inserted into an empty catalog.
pub fn default_repositories() -> Vec<Repository> {
    vec![
        default_repository(
            "https://f-droid.org/repo",
            vec![
                "https://fdroid.tetaneutral.net/fdroid/repo".to_string(),
                "https://ftp.fau.de/fdroid/repo".to_string(),
            ],
            "F-Droid",
            "The official F-Droid Free Software repository.",
            true,
            "43238D512C1E5EB2D6569F4A3AFBF5523418B82E0A3ED1552770ABB9A9C9CCAB",
        ),
        default_repository(
            "https://f-droid.org/archive",
            vec!["https://ftp.fau.de/fdroid/archive".to_string()],
            "F-Droid Archive",
            "Older versions of apps from the official F-Droid repository.",
            false,
            "43238D512C1E5EB2D6569F4A3AFBF5523418B82E0A3ED1552770ABB9A9C9CCAB",
        ),
        default_repository(
            "https://apt.izzysoft.de/fdroid/repo",
            Vec::new(),
            "IzzyOnDroid F-Droid Repo",
            "Apps not (yet) available in the official repository.",
            false,
            "3BF0D6ABFEAE2F401707B6D966BE743BF0EEE49C2561B9BA39073711F628937A",
        ),
    ]
}

fn default_repository(
    address: &str,
    mirrors: Vec<String>,
    name: &str,
    description: &str,
    enabled: bool,
    fingerprint: &str,
) -> Repository {
    let mut repository = Repository::new(address, name);
    repository.mirrors = mirrors;
    repository.description = description.to_string();
    repository.version = 21;
    repository.enabled = enabled;
    repository.fingerprint = fingerprint.to_string();
    repository
}

//! Database configuration.
//!
//! # Invariants
//! - `path = None` selects an in-memory database.
//! - Missing fields deserialize to the runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the catalog database inside the app data directory.
pub const DEFAULT_DATABASE_FILE_NAME: &str = "main_database.db";

/// Busy timeout applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Options controlling how the catalog database is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file location. `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    /// How long a statement waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Drop and rebuild the schema when the on-disk version is unknown.
    pub destructive_fallback: bool,
    /// Insert the built-in repositories into an empty `repository` table.
    pub seed_default_repositories: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            destructive_fallback: true,
            seed_default_repositories: true,
        }
    }
}

impl DatabaseConfig {
    /// Config for a database file at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Config for `main_database.db` inside `dir`.
    pub fn in_directory(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(DEFAULT_DATABASE_FILE_NAME))
    }

    /// Config for an in-memory database.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub(crate) fn mode(&self) -> &'static str {
        if self.path.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}

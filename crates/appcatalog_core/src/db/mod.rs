//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the app catalog.
//! - Apply schema migrations in deterministic order.
//! - Own the process-wide database handle.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Catalog data must not be read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod config;
mod handle;
pub mod migrations;
mod open;
mod seed;

pub use config::{DatabaseConfig, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_FILE_NAME};
pub use handle::CatalogDatabase;
pub use open::{open_db, open_db_in_memory, open_db_with};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The process-wide handle is already bound to another database.
    InstanceConflict {
        active: Option<PathBuf>,
        requested: Option<PathBuf>,
    },
    Encoding(serde_json::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InstanceConflict { active, requested } => write!(
                f,
                "catalog database already opened at `{}`; refusing to switch to `{}`",
                describe_location(active.as_ref()),
                describe_location(requested.as_ref())
            ),
            Self::Encoding(err) => write!(f, "failed to encode column value: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InstanceConflict { .. } => None,
            Self::Encoding(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for DbError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

fn describe_location(path: Option<&PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => ":memory:".to_string(),
    }
}

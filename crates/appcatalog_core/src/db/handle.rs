//! Process-wide catalog database handle.
//!
//! # Responsibility
//! - Own one bootstrapped connection behind a mutex.
//! - Provide the lazily initialized, process-wide instance.
//!
//! # Invariants
//! - The shared instance is initialized at most once per process.
//! - Requests for a different database after initialization are rejected.
//! - A failed initialization leaves the slot empty for a later retry.

use super::config::DatabaseConfig;
use super::open::open_db_with;
use super::{DbError, DbResult};
use log::info;
use once_cell::sync::OnceCell;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

static INSTANCE: OnceCell<CatalogDatabase> = OnceCell::new();

/// Bootstrapped catalog database with a single serialized connection.
pub struct CatalogDatabase {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl CatalogDatabase {
    /// Opens a standalone handle, independent of the shared instance.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        let conn = open_db_with(config)?;
        Ok(Self {
            path: config.path.clone(),
            conn: Mutex::new(conn),
        })
    }

    /// Returns the process-wide handle, opening it on first use.
    ///
    /// Concurrent first calls block on one initialization; later calls
    /// return the cached handle without locking.
    ///
    /// # Errors
    /// - Returns [`DbError::InstanceConflict`] when the handle is already
    ///   bound to a different database file. Paths are compared after
    ///   canonicalization, so relative and absolute spellings of one file
    ///   match.
    /// - Returns bootstrap errors from the first open.
    pub fn instance(config: &DatabaseConfig) -> DbResult<&'static CatalogDatabase> {
        let database = INSTANCE.get_or_try_init(|| {
            let database = Self::open(config)?;
            info!(
                "event=db_instance module=db status=ok mode={}",
                config.mode()
            );
            Ok::<_, DbError>(database)
        })?;

        if !same_location(database.path.as_deref(), config.path.as_deref()) {
            return Err(DbError::InstanceConflict {
                active: database.path.clone(),
                requested: config.path.clone(),
            });
        }
        Ok(database)
    }

    /// Returns the shared handle if it has been initialized.
    pub fn try_instance() -> Option<&'static CatalogDatabase> {
        INSTANCE.get()
    }

    /// Database file path. `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs `work` with exclusive access to the connection.
    pub fn with_connection<T>(&self, work: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.lock();
        work(&conn)
    }

    /// Runs `work` with exclusive mutable access, e.g. to open a
    /// transaction with [`Connection::transaction`].
    pub fn with_connection_mut<T>(&self, work: impl FnOnce(&mut Connection) -> T) -> T {
        let mut conn = self.lock();
        work(&mut conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic inside `work` cannot leave SQLite half-written: open
        // transactions roll back when dropped.
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn same_location(active: Option<&Path>, requested: Option<&Path>) -> bool {
    match (active, requested) {
        (Some(active), Some(requested)) => canonical(active) == canonical(requested),
        (None, None) => true,
        _ => false,
    }
}

// Falls back to the literal path when the file cannot be resolved.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

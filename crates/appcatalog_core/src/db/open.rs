//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations and default seeding before returning a
//!   usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::config::DatabaseConfig;
use super::migrations::{apply_migrations, apply_migrations_or_rebuild};
use super::seed::seed_default_repositories;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and applies all pending migrations.
///
/// Does not seed default repositories and never rebuilds the schema; use
/// [`open_db_with`] for the runtime behavior.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(&DatabaseConfig {
        path: Some(path.as_ref().to_path_buf()),
        destructive_fallback: false,
        seed_default_repositories: false,
        ..DatabaseConfig::default()
    })
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_with(&DatabaseConfig {
        path: None,
        destructive_fallback: false,
        seed_default_repositories: false,
        ..DatabaseConfig::default()
    })
}

/// Opens a database according to `config`.
///
/// # Side effects
/// - May drop and rebuild the whole schema when
///   `config.destructive_fallback` is set and the file carries an unknown
///   schema version.
/// - May insert the default repositories into an empty catalog.
pub fn open_db_with(config: &DatabaseConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match config.path.as_deref() {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, config: &DatabaseConfig) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

    if config.destructive_fallback {
        apply_migrations_or_rebuild(conn)?;
    } else {
        apply_migrations(conn)?;
    }

    if config.seed_default_repositories {
        let inserted = seed_default_repositories(conn)?;
        if inserted > 0 {
            info!("event=db_seed module=db status=ok repositories={inserted}");
        }
    }
    Ok(())
}

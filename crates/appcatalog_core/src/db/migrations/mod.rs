//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Rebuild the schema from scratch when no migration path exists.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::warn;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_catalog.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_installed.sql"),
    },
    Migration {
        version: 3,
        sql: include_str!("0003_extras.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// Fails with [`DbError::UnsupportedSchemaVersion`] when the database was
/// written by a newer schema.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

/// Applies migrations, dropping and rebuilding the schema when the database
/// carries a version this binary has no path from.
///
/// Returns `true` when the destructive rebuild ran.
pub fn apply_migrations_or_rebuild(conn: &mut Connection) -> DbResult<bool> {
    match apply_migrations(conn) {
        Ok(()) => Ok(false),
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            warn!(
                "event=db_migrate module=db status=rebuild db_version={} latest_supported={}",
                db_version, latest_supported
            );
            drop_all_schema_objects(conn)?;
            apply_migrations(conn)?;
            Ok(true)
        }
        Err(err) => Err(err),
    }
}

/// Returns the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Drops every user object with foreign-key enforcement switched off, so
/// tables of an unknown schema drop regardless of their reference order.
///
/// `PRAGMA foreign_keys` is a no-op inside a transaction; it is toggled
/// around it and restored on every path.
fn drop_all_schema_objects(conn: &mut Connection) -> DbResult<()> {
    let enforced: i64 = conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?;
    if enforced == 0 {
        return drop_all_schema_objects_in_tx(conn);
    }

    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let dropped = drop_all_schema_objects_in_tx(conn);
    let restored = conn.execute_batch("PRAGMA foreign_keys = ON;");
    dropped?;
    restored?;
    Ok(())
}

fn drop_all_schema_objects_in_tx(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    let objects = {
        let mut stmt = tx.prepare(
            "SELECT type, name
             FROM sqlite_master
             WHERE type IN ('table', 'view', 'index', 'trigger')
               AND name NOT LIKE 'sqlite_%'
             ORDER BY CASE type
                 WHEN 'view' THEN 0
                 WHEN 'trigger' THEN 1
                 WHEN 'index' THEN 2
                 ELSE 3
             END, name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut objects = Vec::new();
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let name: String = row.get(1)?;
            objects.push((kind, name));
        }
        objects
    };

    for (kind, name) in objects {
        // Autoindexes and indexes of dropped tables disappear with the table.
        let statement = match kind.as_str() {
            "view" => format!("DROP VIEW IF EXISTS \"{}\";", escape_identifier(&name)),
            "trigger" => format!("DROP TRIGGER IF EXISTS \"{}\";", escape_identifier(&name)),
            "index" => format!("DROP INDEX IF EXISTS \"{}\";", escape_identifier(&name)),
            _ => format!("DROP TABLE IF EXISTS \"{}\";", escape_identifier(&name)),
        };
        tx.execute_batch(&statement)?;
    }

    let has_sequence: i64 = tx.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'
        );",
        [],
        |row| row.get(0),
    )?;
    if has_sequence == 1 {
        tx.execute_batch("DELETE FROM sqlite_sequence;")?;
    }

    tx.execute_batch("PRAGMA user_version = 0;")?;
    tx.commit()?;
    Ok(())
}

fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}

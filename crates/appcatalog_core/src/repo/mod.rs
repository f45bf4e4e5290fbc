//! Data-access objects over the catalog tables.
//!
//! # Responsibility
//! - One DAO per table family, each with a trait contract and a SQLite
//!   implementation.
//! - Keep SQL and column encoding inside the persistence boundary.
//!
//! # Invariants
//! - DAOs only attach to fully migrated connections (`try_new`).
//! - Write paths validate records before SQL mutations.
//! - Read paths reject undecodable rows instead of masking them.
//! - Multi-row writes join the caller's transaction when one is open and
//!   open their own otherwise.

pub mod category_repo;
pub mod error;
pub mod extras_repo;
pub mod installed_repo;
pub mod product_repo;
pub mod release_repo;
pub mod repository_repo;

use crate::db::migrations::latest_version;
use error::{RepoError, RepoResult};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};

/// Selects the live tables or their sync staging copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTable {
    /// Tables read by the app.
    Live,
    /// Staging tables filled during a sync.
    Temporary,
}

impl CatalogTable {
    pub fn product_table(self) -> &'static str {
        match self {
            Self::Live => "product",
            Self::Temporary => "product_temp",
        }
    }

    pub fn category_table(self) -> &'static str {
        match self {
            Self::Live => "category",
            Self::Temporary => "category_temp",
        }
    }
}

/// Runs `work` inside the caller's open transaction, or inside a new
/// immediate transaction when the connection is in autocommit mode.
pub(crate) fn in_write_transaction<T>(
    conn: &Connection,
    work: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return work(conn);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn encode_list(values: &[String]) -> RepoResult<String> {
    Ok(serde_json::to_string(values)?)
}

pub(crate) fn decode_list(value: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid list value in {column}: {err}")))
}

pub(crate) fn count_rows(conn: &Connection, table: &str) -> RepoResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Deletes rows whose `column` matches any of `ids` with one statement.
pub(crate) fn delete_where_in(
    conn: &Connection,
    table: &str,
    column: &str,
    ids: &[i64],
) -> RepoResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let changed = conn.execute(
        &format!(
            "DELETE FROM {table} WHERE {column} IN ({});",
            placeholder_list(ids.len())
        ),
        params_from_iter(ids.iter()),
    )?;
    Ok(changed)
}

pub(crate) fn column_list(columns: &[&str]) -> String {
    columns.join(", ")
}

pub(crate) fn placeholder_list(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

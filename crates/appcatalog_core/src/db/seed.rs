//! Default repository seeding for empty catalogs.

use super::DbResult;
use crate::model::repository::default_repositories;
use crate::repo::repository_repo::write_repository_row;
use rusqlite::{Connection, TransactionBehavior};

/// Inserts the built-in repositories when the `repository` table is empty.
///
/// Returns how many rows were inserted; `0` when the table already had rows.
pub(super) fn seed_default_repositories(conn: &mut Connection) -> DbResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM repository;", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    let defaults = default_repositories();
    for repository in &defaults {
        write_repository_row(&tx, repository)?;
    }
    tx.commit()?;
    Ok(defaults.len())
}

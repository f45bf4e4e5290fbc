//! Repository (catalog source) DAO.
//!
//! # Invariants
//! - `put` with `id = None` always inserts and returns the new row id.
//! - `put` with an id replaces that row wholesale.
//! - Deleting a repository row leaves its products in place; the clean-up
//!   pass owns cascading removal.

use super::error::{RepoError, RepoResult};
use super::{
    bool_to_int, count_rows, decode_list, delete_where_in, ensure_connection_ready, parse_bool,
};
use crate::db::DbResult;
use crate::model::repository::{normalize_fingerprint, Repository, RepositoryId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const REPOSITORY_COLUMNS: &[&str] = &[
    "id",
    "address",
    "mirrors",
    "name",
    "description",
    "version",
    "enabled",
    "fingerprint",
    "last_modified",
    "entity_tag",
    "updated",
    "timestamp",
    "authentication",
    "deleted",
];

const REPOSITORY_SELECT_SQL: &str = "SELECT
    id,
    address,
    mirrors,
    name,
    description,
    version,
    enabled,
    fingerprint,
    last_modified,
    entity_tag,
    updated,
    timestamp,
    authentication,
    deleted
FROM repository";

/// Data access for the `repository` table.
pub trait RepositoryDao {
    /// Inserts or replaces one repository and returns its id.
    fn put(&self, repository: &Repository) -> RepoResult<RepositoryId>;
    fn get(&self, id: RepositoryId) -> RepoResult<Option<Repository>>;
    /// All rows, tombstoned ones included, by id.
    fn all(&self) -> RepoResult<Vec<Repository>>;
    /// Enabled, non-deleted repositories by id.
    fn enabled(&self) -> RepoResult<Vec<Repository>>;
    fn count(&self) -> RepoResult<u64>;
    fn set_enabled(&self, id: RepositoryId, enabled: bool) -> RepoResult<()>;
    /// Tombstones a repository: `deleted = 1`, `enabled = 0`.
    fn mark_as_deleted(&self, id: RepositoryId) -> RepoResult<()>;
    /// Removes the row. Returns whether a row existed.
    fn delete_by_id(&self, id: RepositoryId) -> RepoResult<bool>;
    /// Removes all listed rows in one statement. Returns the row count.
    fn delete_by_ids(&self, ids: &[RepositoryId]) -> RepoResult<usize>;
}

/// SQLite-backed repository DAO.
pub struct SqliteRepositoryDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositoryDao<'conn> {
    /// Creates the DAO from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "repository", REPOSITORY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl RepositoryDao for SqliteRepositoryDao<'_> {
    fn put(&self, repository: &Repository) -> RepoResult<RepositoryId> {
        repository.validate()?;
        Ok(write_repository_row(self.conn, repository)?)
    }

    fn get(&self, id: RepositoryId) -> RepoResult<Option<Repository>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REPOSITORY_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_repository_row(row)))
            .optional()?;
        row.transpose()
    }

    fn all(&self) -> RepoResult<Vec<Repository>> {
        query_repositories(
            self.conn,
            &format!("{REPOSITORY_SELECT_SQL} ORDER BY id ASC;"),
        )
    }

    fn enabled(&self) -> RepoResult<Vec<Repository>> {
        query_repositories(
            self.conn,
            &format!(
                "{REPOSITORY_SELECT_SQL}
                 WHERE enabled = 1
                   AND deleted = 0
                 ORDER BY id ASC;"
            ),
        )
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, "repository")
    }

    fn set_enabled(&self, id: RepositoryId, enabled: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE repository SET enabled = ?2 WHERE id = ?1;",
            params![id, bool_to_int(enabled)],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn mark_as_deleted(&self, id: RepositoryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE repository SET deleted = 1, enabled = 0 WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn delete_by_id(&self, id: RepositoryId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM repository WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn delete_by_ids(&self, ids: &[RepositoryId]) -> RepoResult<usize> {
        delete_where_in(self.conn, "repository", "id", ids)
    }
}

/// Writes one repository row without validation. The fingerprint is
/// stored normalized.
///
/// Shared by the DAO and default-repository seeding.
pub(crate) fn write_repository_row(
    conn: &Connection,
    repository: &Repository,
) -> DbResult<RepositoryId> {
    let mirrors = serde_json::to_string(&repository.mirrors)?;
    let fingerprint = normalize_fingerprint(&repository.fingerprint);
    conn.execute(
        "INSERT OR REPLACE INTO repository (
            id,
            address,
            mirrors,
            name,
            description,
            version,
            enabled,
            fingerprint,
            last_modified,
            entity_tag,
            updated,
            timestamp,
            authentication,
            deleted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
        params![
            repository.id,
            repository.address.as_str(),
            mirrors,
            repository.name.as_str(),
            repository.description.as_str(),
            repository.version,
            bool_to_int(repository.enabled),
            fingerprint,
            repository.last_modified.as_str(),
            repository.entity_tag.as_str(),
            repository.updated,
            repository.timestamp,
            repository.authentication.as_str(),
            bool_to_int(repository.deleted),
        ],
    )?;

    Ok(repository.id.unwrap_or_else(|| conn.last_insert_rowid()))
}

fn query_repositories(conn: &Connection, sql: &str) -> RepoResult<Vec<Repository>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut repositories = Vec::new();
    while let Some(row) = rows.next()? {
        repositories.push(parse_repository_row(row)?);
    }
    Ok(repositories)
}

fn parse_repository_row(row: &Row<'_>) -> RepoResult<Repository> {
    let mirrors_text: String = row.get("mirrors")?;
    Ok(Repository {
        id: Some(row.get("id")?),
        address: row.get("address")?,
        mirrors: decode_list(&mirrors_text, "repository.mirrors")?,
        name: row.get("name")?,
        description: row.get("description")?,
        version: row.get("version")?,
        enabled: parse_bool(row.get("enabled")?, "repository.enabled")?,
        fingerprint: row.get("fingerprint")?,
        last_modified: row.get("last_modified")?,
        entity_tag: row.get("entity_tag")?,
        updated: row.get("updated")?,
        timestamp: row.get("timestamp")?,
        authentication: row.get("authentication")?,
        deleted: parse_bool(row.get("deleted")?, "repository.deleted")?,
    })
}

fn not_found(id: RepositoryId) -> RepoError {
    RepoError::NotFound {
        table: "repository",
        key: id.to_string(),
    }
}

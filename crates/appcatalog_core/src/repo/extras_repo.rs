//! Per-app extras DAO.
//!
//! # Invariants
//! - Single-flag setters upsert: a missing row is created with every other
//!   flag at its default.

use super::error::RepoResult;
use super::{bool_to_int, ensure_connection_ready, parse_bool};
use crate::model::ensure_package_name;
use crate::model::installed::Extras;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EXTRAS_COLUMNS: &[&str] = &[
    "package_name",
    "favorite",
    "ignore_updates",
    "ignore_vulns",
    "ignored_version",
];

const EXTRAS_SELECT_SQL: &str = "SELECT
    package_name,
    favorite,
    ignore_updates,
    ignore_vulns,
    ignored_version
FROM extras";

/// Data access for `extras`.
pub trait ExtrasDao {
    fn get(&self, package_name: &str) -> RepoResult<Option<Extras>>;
    /// Inserts or replaces the full record.
    fn put(&self, extras: &Extras) -> RepoResult<()>;
    /// Removes one record. Returns whether a row existed.
    fn delete(&self, package_name: &str) -> RepoResult<bool>;
    fn all(&self) -> RepoResult<Vec<Extras>>;
    /// Package names marked favorite, sorted.
    fn favorites(&self) -> RepoResult<Vec<String>>;
    fn set_favorite(&self, package_name: &str, favorite: bool) -> RepoResult<()>;
    fn set_ignore_updates(&self, package_name: &str, ignore: bool) -> RepoResult<()>;
    fn set_ignore_vulns(&self, package_name: &str, ignore: bool) -> RepoResult<()>;
    /// Skips one version code. `0` clears the skip.
    fn set_ignored_version(&self, package_name: &str, version_code: i64) -> RepoResult<()>;
}

/// SQLite-backed extras DAO.
pub struct SqliteExtrasDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExtrasDao<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "extras", EXTRAS_COLUMNS)?;
        Ok(Self { conn })
    }

    fn upsert_column(&self, package_name: &str, column: &str, value: i64) -> RepoResult<()> {
        ensure_package_name(package_name)?;
        self.conn.execute(
            &format!(
                "INSERT INTO extras (package_name, {column})
                 VALUES (?1, ?2)
                 ON CONFLICT(package_name) DO UPDATE SET {column} = excluded.{column};"
            ),
            params![package_name, value],
        )?;
        Ok(())
    }
}

impl ExtrasDao for SqliteExtrasDao<'_> {
    fn get(&self, package_name: &str) -> RepoResult<Option<Extras>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EXTRAS_SELECT_SQL} WHERE package_name = ?1;"))?;
        let row = stmt
            .query_row([package_name], |row| Ok(parse_extras_row(row)))
            .optional()?;
        row.transpose()
    }

    fn put(&self, extras: &Extras) -> RepoResult<()> {
        extras.validate()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO extras (
                package_name,
                favorite,
                ignore_updates,
                ignore_vulns,
                ignored_version
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                extras.package_name.as_str(),
                bool_to_int(extras.favorite),
                bool_to_int(extras.ignore_updates),
                bool_to_int(extras.ignore_vulns),
                extras.ignored_version,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, package_name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM extras WHERE package_name = ?1;", [package_name])?;
        Ok(changed > 0)
    }

    fn all(&self) -> RepoResult<Vec<Extras>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EXTRAS_SELECT_SQL} ORDER BY package_name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_extras_row(row)?);
        }
        Ok(items)
    }

    fn favorites(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT package_name
             FROM extras
             WHERE favorite = 1
             ORDER BY package_name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    fn set_favorite(&self, package_name: &str, favorite: bool) -> RepoResult<()> {
        self.upsert_column(package_name, "favorite", bool_to_int(favorite))
    }

    fn set_ignore_updates(&self, package_name: &str, ignore: bool) -> RepoResult<()> {
        self.upsert_column(package_name, "ignore_updates", bool_to_int(ignore))
    }

    fn set_ignore_vulns(&self, package_name: &str, ignore: bool) -> RepoResult<()> {
        self.upsert_column(package_name, "ignore_vulns", bool_to_int(ignore))
    }

    fn set_ignored_version(&self, package_name: &str, version_code: i64) -> RepoResult<()> {
        self.upsert_column(package_name, "ignored_version", version_code)
    }
}

fn parse_extras_row(row: &Row<'_>) -> RepoResult<Extras> {
    Ok(Extras {
        package_name: row.get("package_name")?,
        favorite: parse_bool(row.get("favorite")?, "extras.favorite")?,
        ignore_updates: parse_bool(row.get("ignore_updates")?, "extras.ignore_updates")?,
        ignore_vulns: parse_bool(row.get("ignore_vulns")?, "extras.ignore_vulns")?,
        ignored_version: row.get("ignored_version")?,
    })
}

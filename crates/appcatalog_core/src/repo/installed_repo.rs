//! Installed-app DAO.
//!
//! # Invariants
//! - One row per package name.
//! - `replace_all` swaps the whole table in one transaction.

use super::error::RepoResult;
use super::{bool_to_int, ensure_connection_ready, in_write_transaction, parse_bool};
use crate::model::installed::Installed;
use rusqlite::{params, Connection, OptionalExtension, Row};

const INSTALLED_COLUMNS: &[&str] = &[
    "package_name",
    "version",
    "version_code",
    "signature",
    "is_system",
];

/// Data access for `installed`.
pub trait InstalledDao {
    /// Inserts or replaces one installed record.
    fn put(&self, installed: &Installed) -> RepoResult<()>;
    fn get(&self, package_name: &str) -> RepoResult<Option<Installed>>;
    /// All records by package name.
    fn all(&self) -> RepoResult<Vec<Installed>>;
    /// Removes one record. Returns whether a row existed.
    fn delete(&self, package_name: &str) -> RepoResult<bool>;
    /// Replaces the table contents with `installed`.
    fn replace_all(&self, installed: &[Installed]) -> RepoResult<()>;
}

/// SQLite-backed installed-app DAO.
pub struct SqliteInstalledDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInstalledDao<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "installed", INSTALLED_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl InstalledDao for SqliteInstalledDao<'_> {
    fn put(&self, installed: &Installed) -> RepoResult<()> {
        installed.validate()?;
        write_installed_row(self.conn, installed)
    }

    fn get(&self, package_name: &str) -> RepoResult<Option<Installed>> {
        let mut stmt = self.conn.prepare(
            "SELECT package_name, version, version_code, signature, is_system
             FROM installed
             WHERE package_name = ?1;",
        )?;
        let row = stmt
            .query_row([package_name], |row| Ok(parse_installed_row(row)))
            .optional()?;
        row.transpose()
    }

    fn all(&self) -> RepoResult<Vec<Installed>> {
        let mut stmt = self.conn.prepare(
            "SELECT package_name, version, version_code, signature, is_system
             FROM installed
             ORDER BY package_name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_installed_row(row)?);
        }
        Ok(items)
    }

    fn delete(&self, package_name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM installed WHERE package_name = ?1;", [package_name])?;
        Ok(changed > 0)
    }

    fn replace_all(&self, installed: &[Installed]) -> RepoResult<()> {
        for item in installed {
            item.validate()?;
        }

        in_write_transaction(self.conn, |conn| {
            conn.execute("DELETE FROM installed;", [])?;
            for item in installed {
                write_installed_row(conn, item)?;
            }
            Ok(())
        })
    }
}

fn write_installed_row(conn: &Connection, installed: &Installed) -> RepoResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO installed (
            package_name,
            version,
            version_code,
            signature,
            is_system
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            installed.package_name.as_str(),
            installed.version.as_str(),
            installed.version_code,
            installed.signature.as_str(),
            bool_to_int(installed.is_system),
        ],
    )?;
    Ok(())
}

fn parse_installed_row(row: &Row<'_>) -> RepoResult<Installed> {
    Ok(Installed {
        package_name: row.get("package_name")?,
        version: row.get("version")?,
        version_code: row.get("version_code")?,
        signature: row.get("signature")?,
        is_system: parse_bool(row.get("is_system")?, "installed.is_system")?,
    })
}

//! Release DAO.

use super::error::RepoResult;
use super::{
    column_list, count_rows, decode_list, encode_list, ensure_connection_ready,
    in_write_transaction, placeholder_list,
};
use crate::model::release::Release;
use crate::model::repository::RepositoryId;
use rusqlite::{params, Connection, Row};

const RELEASE_COLUMNS: &[&str] = &[
    "repository_id",
    "package_name",
    "version",
    "version_code",
    "added",
    "size",
    "min_sdk_version",
    "target_sdk_version",
    "max_sdk_version",
    "file_name",
    "hash",
    "hash_type",
    "signature",
    "permissions",
    "features",
    "platforms",
    "incompatibilities",
];

/// Data access for `product_release`.
pub trait ReleaseDao {
    /// Inserts or replaces all `releases` atomically.
    fn insert(&self, releases: &[Release]) -> RepoResult<()>;
    /// Releases of one package, newest version code first.
    fn for_product(&self, package_name: &str) -> RepoResult<Vec<Release>>;
    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed release DAO.
pub struct SqliteReleaseDao<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReleaseDao<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "product_release", RELEASE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl ReleaseDao for SqliteReleaseDao<'_> {
    fn insert(&self, releases: &[Release]) -> RepoResult<()> {
        for release in releases {
            release.validate()?;
        }

        let sql = format!(
            "INSERT OR REPLACE INTO product_release ({}) VALUES ({});",
            column_list(RELEASE_COLUMNS),
            placeholder_list(RELEASE_COLUMNS.len())
        );
        in_write_transaction(self.conn, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            for release in releases {
                stmt.execute(params![
                    release.repository_id,
                    release.package_name.as_str(),
                    release.version.as_str(),
                    release.version_code,
                    release.added,
                    release.size,
                    release.min_sdk_version,
                    release.target_sdk_version,
                    release.max_sdk_version,
                    release.file_name.as_str(),
                    release.hash.as_str(),
                    release.hash_type.as_str(),
                    release.signature.as_str(),
                    encode_list(&release.permissions)?,
                    encode_list(&release.features)?,
                    encode_list(&release.platforms)?,
                    encode_list(&release.incompatibilities)?,
                ])?;
            }
            Ok(())
        })
    }

    fn for_product(&self, package_name: &str) -> RepoResult<Vec<Release>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}
             FROM product_release
             WHERE package_name = ?1
             ORDER BY version_code DESC, repository_id ASC, signature ASC;",
            column_list(RELEASE_COLUMNS)
        ))?;
        let mut rows = stmt.query([package_name])?;
        let mut releases = Vec::new();
        while let Some(row) = rows.next()? {
            releases.push(parse_release_row(row)?);
        }
        Ok(releases)
    }

    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM product_release WHERE repository_id = ?1;",
            [repository_id],
        )?;
        Ok(changed)
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, "product_release")
    }
}

fn parse_release_row(row: &Row<'_>) -> RepoResult<Release> {
    let permissions: String = row.get("permissions")?;
    let features: String = row.get("features")?;
    let platforms: String = row.get("platforms")?;
    let incompatibilities: String = row.get("incompatibilities")?;

    Ok(Release {
        repository_id: row.get("repository_id")?,
        package_name: row.get("package_name")?,
        version: row.get("version")?,
        version_code: row.get("version_code")?,
        added: row.get("added")?,
        size: row.get("size")?,
        min_sdk_version: row.get("min_sdk_version")?,
        target_sdk_version: row.get("target_sdk_version")?,
        max_sdk_version: row.get("max_sdk_version")?,
        file_name: row.get("file_name")?,
        hash: row.get("hash")?,
        hash_type: row.get("hash_type")?,
        signature: row.get("signature")?,
        permissions: decode_list(&permissions, "product_release.permissions")?,
        features: decode_list(&features, "product_release.features")?,
        platforms: decode_list(&platforms, "product_release.platforms")?,
        incompatibilities: decode_list(&incompatibilities, "product_release.incompatibilities")?,
    })
}

//! Category DAO over the live or temporary category table.

use super::error::RepoResult;
use super::{
    count_rows, delete_where_in, ensure_connection_ready, in_write_transaction, CatalogTable,
};
use crate::model::product::Category;
use crate::model::repository::RepositoryId;
use rusqlite::{params, Connection, Row};

const CATEGORY_COLUMNS: &[&str] = &["repository_id", "package_name", "label"];

/// Data access for `category` / `category_temp`.
pub trait CategoryDao {
    /// Inserts all `categories` atomically; duplicates collapse.
    fn insert(&self, categories: &[Category]) -> RepoResult<()>;
    /// Categories of one package across repositories.
    fn for_product(&self, package_name: &str) -> RepoResult<Vec<Category>>;
    /// Sorted distinct labels used by enabled, non-deleted repositories.
    fn distinct_labels(&self) -> RepoResult<Vec<String>>;
    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize>;
    /// Removes every category of the given repositories in one statement.
    fn delete_by_repository_ids(&self, repository_ids: &[RepositoryId]) -> RepoResult<usize>;
    fn empty_table(&self) -> RepoResult<usize>;
    /// Copies every row of `source` into this table. Returns the row count.
    fn copy_from(&self, source: CatalogTable) -> RepoResult<usize>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed category DAO.
pub struct SqliteCategoryDao<'conn> {
    conn: &'conn Connection,
    table: CatalogTable,
}

impl<'conn> SqliteCategoryDao<'conn> {
    /// DAO over the live `category` table.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::try_new_for(conn, CatalogTable::Live)
    }

    /// DAO over the `category_temp` staging table.
    pub fn try_new_temporary(conn: &'conn Connection) -> RepoResult<Self> {
        Self::try_new_for(conn, CatalogTable::Temporary)
    }

    pub fn try_new_for(conn: &'conn Connection, table: CatalogTable) -> RepoResult<Self> {
        ensure_connection_ready(conn, table.category_table(), CATEGORY_COLUMNS)?;
        Ok(Self { conn, table })
    }
}

impl CategoryDao for SqliteCategoryDao<'_> {
    fn insert(&self, categories: &[Category]) -> RepoResult<()> {
        for category in categories {
            category.validate()?;
        }

        let sql = format!(
            "INSERT OR REPLACE INTO {} (repository_id, package_name, label)
             VALUES (?1, ?2, ?3);",
            self.table.category_table()
        );
        in_write_transaction(self.conn, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            for category in categories {
                stmt.execute(params![
                    category.repository_id,
                    category.package_name.as_str(),
                    category.label.as_str(),
                ])?;
            }
            Ok(())
        })
    }

    fn for_product(&self, package_name: &str) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT repository_id, package_name, label
             FROM {}
             WHERE package_name = ?1
             ORDER BY repository_id ASC, label ASC;",
            self.table.category_table()
        ))?;
        let mut rows = stmt.query([package_name])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn distinct_labels(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT c.label
             FROM {} c
             INNER JOIN repository r ON r.id = c.repository_id
             WHERE r.enabled = 1
               AND r.deleted = 0
             ORDER BY c.label COLLATE NOCASE ASC, c.label ASC;",
            self.table.category_table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(row.get(0)?);
        }
        Ok(labels)
    }

    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE repository_id = ?1;",
                self.table.category_table()
            ),
            [repository_id],
        )?;
        Ok(changed)
    }

    fn delete_by_repository_ids(&self, repository_ids: &[RepositoryId]) -> RepoResult<usize> {
        delete_where_in(
            self.conn,
            self.table.category_table(),
            "repository_id",
            repository_ids,
        )
    }

    fn empty_table(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {};", self.table.category_table()), [])?;
        Ok(changed)
    }

    fn copy_from(&self, source: CatalogTable) -> RepoResult<usize> {
        if source == self.table {
            return Ok(0);
        }
        let copied = self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (repository_id, package_name, label)
                 SELECT repository_id, package_name, label FROM {};",
                self.table.category_table(),
                source.category_table()
            ),
            [],
        )?;
        Ok(copied)
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, self.table.category_table())
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    Ok(Category {
        repository_id: row.get("repository_id")?,
        package_name: row.get("package_name")?,
        label: row.get("label")?,
    })
}

//! Product DAO over the live or temporary product table.
//!
//! # Responsibility
//! - Batch writes used by repository sync (temporary table) and promotion
//!   (live table).
//! - Filtered, ordered product listings for catalog screens.
//!
//! # Invariants
//! - Listings only include products of enabled, non-deleted repositories.
//! - Listing order is deterministic: the chosen key, then
//!   `package_name ASC, repository_id ASC`.

use super::error::RepoResult;
use super::{
    bool_to_int, column_list, count_rows, decode_list, delete_where_in, encode_list,
    ensure_connection_ready, in_write_transaction, parse_bool, placeholder_list, CatalogTable,
};
use crate::model::product::Product;
use crate::model::repository::RepositoryId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PRODUCT_COLUMNS: &[&str] = &[
    "repository_id",
    "package_name",
    "label",
    "summary",
    "description",
    "added",
    "updated",
    "version",
    "version_code",
    "suggested_version_code",
    "icon",
    "metadata_icon",
    "author",
    "source",
    "web",
    "licenses",
    "screenshots",
    "signatures",
    "compatible",
];

/// Version code offered as an update, in SQL. Matches
/// [`Product::target_version_code`].
const TARGET_VERSION_CODE_SQL: &str =
    "(CASE WHEN p.suggested_version_code > 0 THEN p.suggested_version_code ELSE p.version_code END)";

/// Sort key for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    /// Label, case-insensitive, ascending.
    #[default]
    Name,
    /// Newest `added` first.
    DateAdded,
    /// Newest `updated` first.
    LastUpdate,
}

/// Filter and pagination options for product listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListQuery {
    /// Case-insensitive substring of label, summary or package name.
    pub search: Option<String>,
    /// Exact category label.
    pub category: Option<String>,
    /// Only packages present in `installed`.
    pub installed_only: bool,
    /// Only installed packages with an update that is not ignored.
    pub updates_only: bool,
    pub order: ProductOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Data access for `product` / `product_temp`.
pub trait ProductDao {
    /// Inserts or replaces all `products` atomically.
    fn insert(&self, products: &[Product]) -> RepoResult<()>;
    /// The package as listed by every repository, by repository id.
    fn get(&self, package_name: &str) -> RepoResult<Vec<Product>>;
    fn get_in_repository(
        &self,
        repository_id: RepositoryId,
        package_name: &str,
    ) -> RepoResult<Option<Product>>;
    fn all(&self) -> RepoResult<Vec<Product>>;
    fn count(&self) -> RepoResult<u64>;
    /// Removes every product of one repository. Returns the row count.
    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize>;
    /// Removes every product of the given repositories in one statement.
    fn delete_by_repository_ids(&self, repository_ids: &[RepositoryId]) -> RepoResult<usize>;
    /// Removes every row. Returns the row count.
    fn empty_table(&self) -> RepoResult<usize>;
    /// Copies every row of `source` into this table, replacing rows with
    /// the same key. Returns the row count.
    fn copy_from(&self, source: CatalogTable) -> RepoResult<usize>;
    fn list(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>>;
}

/// SQLite-backed product DAO.
pub struct SqliteProductDao<'conn> {
    conn: &'conn Connection,
    table: CatalogTable,
}

impl<'conn> SqliteProductDao<'conn> {
    /// DAO over the live `product` table.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::try_new_for(conn, CatalogTable::Live)
    }

    /// DAO over the `product_temp` staging table.
    pub fn try_new_temporary(conn: &'conn Connection) -> RepoResult<Self> {
        Self::try_new_for(conn, CatalogTable::Temporary)
    }

    pub fn try_new_for(conn: &'conn Connection, table: CatalogTable) -> RepoResult<Self> {
        ensure_connection_ready(conn, table.product_table(), PRODUCT_COLUMNS)?;
        Ok(Self { conn, table })
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            column_list(PRODUCT_COLUMNS),
            self.table.product_table()
        )
    }
}

impl ProductDao for SqliteProductDao<'_> {
    fn insert(&self, products: &[Product]) -> RepoResult<()> {
        for product in products {
            product.validate()?;
        }

        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({});",
            self.table.product_table(),
            column_list(PRODUCT_COLUMNS),
            placeholder_list(PRODUCT_COLUMNS.len())
        );
        in_write_transaction(self.conn, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            for product in products {
                stmt.execute(params![
                    product.repository_id,
                    product.package_name.as_str(),
                    product.label.as_str(),
                    product.summary.as_str(),
                    product.description.as_str(),
                    product.added,
                    product.updated,
                    product.version.as_str(),
                    product.version_code,
                    product.suggested_version_code,
                    product.icon.as_str(),
                    product.metadata_icon.as_str(),
                    product.author.as_str(),
                    product.source.as_str(),
                    product.web.as_str(),
                    encode_list(&product.licenses)?,
                    encode_list(&product.screenshots)?,
                    encode_list(&product.signatures)?,
                    bool_to_int(product.compatible),
                ])?;
            }
            Ok(())
        })
    }

    fn get(&self, package_name: &str) -> RepoResult<Vec<Product>> {
        let sql = format!(
            "{} WHERE package_name = ?1 ORDER BY repository_id ASC;",
            self.select_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([package_name])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row, self.table)?);
        }
        Ok(products)
    }

    fn get_in_repository(
        &self,
        repository_id: RepositoryId,
        package_name: &str,
    ) -> RepoResult<Option<Product>> {
        let sql = format!(
            "{} WHERE repository_id = ?1 AND package_name = ?2;",
            self.select_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let row = stmt
            .query_row(params![repository_id, package_name], |row| {
                Ok(parse_product_row(row, self.table))
            })
            .optional()?;
        row.transpose()
    }

    fn all(&self) -> RepoResult<Vec<Product>> {
        let sql = format!(
            "{} ORDER BY repository_id ASC, package_name ASC;",
            self.select_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row, self.table)?);
        }
        Ok(products)
    }

    fn count(&self) -> RepoResult<u64> {
        count_rows(self.conn, self.table.product_table())
    }

    fn delete_by_repository_id(&self, repository_id: RepositoryId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE repository_id = ?1;",
                self.table.product_table()
            ),
            [repository_id],
        )?;
        Ok(changed)
    }

    fn delete_by_repository_ids(&self, repository_ids: &[RepositoryId]) -> RepoResult<usize> {
        delete_where_in(
            self.conn,
            self.table.product_table(),
            "repository_id",
            repository_ids,
        )
    }

    fn empty_table(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {};", self.table.product_table()), [])?;
        Ok(changed)
    }

    fn copy_from(&self, source: CatalogTable) -> RepoResult<usize> {
        if source == self.table {
            return Ok(0);
        }
        let columns = column_list(PRODUCT_COLUMNS);
        let copied = self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({columns}) SELECT {columns} FROM {};",
                self.table.product_table(),
                source.product_table()
            ),
            [],
        )?;
        Ok(copied)
    }

    fn list(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>> {
        let select_list = PRODUCT_COLUMNS
            .iter()
            .map(|column| format!("p.{column} AS {column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {select_list}
             FROM {} p
             INNER JOIN repository r ON r.id = p.repository_id
             LEFT JOIN installed i ON i.package_name = p.package_name
             LEFT JOIN extras e ON e.package_name = p.package_name
             WHERE r.enabled = 1
               AND r.deleted = 0",
            self.table.product_table()
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let pattern = format!("%{}%", escape_like(search));
                sql.push_str(
                    " AND (p.label LIKE ? ESCAPE '\\'
                        OR p.summary LIKE ? ESCAPE '\\'
                        OR p.package_name LIKE ? ESCAPE '\\')",
                );
                for _ in 0..3 {
                    bind_values.push(Value::Text(pattern.clone()));
                }
            }
        }

        if let Some(category) = query.category.as_deref() {
            sql.push_str(&format!(
                " AND EXISTS(
                    SELECT 1
                    FROM {} c
                    WHERE c.repository_id = p.repository_id
                      AND c.package_name = p.package_name
                      AND c.label = ?
                )",
                self.table.category_table()
            ));
            bind_values.push(Value::Text(category.to_string()));
        }

        if query.installed_only || query.updates_only {
            sql.push_str(" AND i.package_name IS NOT NULL");
        }

        if query.updates_only {
            sql.push_str(&format!(
                " AND p.compatible = 1
                  AND {TARGET_VERSION_CODE_SQL} > i.version_code
                  AND (
                    e.package_name IS NULL
                    OR (e.ignore_updates = 0 AND e.ignored_version != {TARGET_VERSION_CODE_SQL})
                  )"
            ));
        }

        sql.push_str(match query.order {
            ProductOrder::Name => " ORDER BY p.label COLLATE NOCASE ASC",
            ProductOrder::DateAdded => " ORDER BY p.added DESC",
            ProductOrder::LastUpdate => " ORDER BY p.updated DESC",
        });
        sql.push_str(", p.package_name ASC, p.repository_id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row, self.table)?);
        }
        Ok(products)
    }
}

fn parse_product_row(row: &Row<'_>, table: CatalogTable) -> RepoResult<Product> {
    let table_name = table.product_table();
    let licenses: String = row.get("licenses")?;
    let screenshots: String = row.get("screenshots")?;
    let signatures: String = row.get("signatures")?;

    Ok(Product {
        repository_id: row.get("repository_id")?,
        package_name: row.get("package_name")?,
        label: row.get("label")?,
        summary: row.get("summary")?,
        description: row.get("description")?,
        added: row.get("added")?,
        updated: row.get("updated")?,
        version: row.get("version")?,
        version_code: row.get("version_code")?,
        suggested_version_code: row.get("suggested_version_code")?,
        icon: row.get("icon")?,
        metadata_icon: row.get("metadata_icon")?,
        author: row.get("author")?,
        source: row.get("source")?,
        web: row.get("web")?,
        licenses: decode_list(&licenses, &format!("{table_name}.licenses"))?,
        screenshots: decode_list(&screenshots, &format!("{table_name}.screenshots"))?,
        signatures: decode_list(&signatures, &format!("{table_name}.signatures"))?,
        compatible: parse_bool(
            row.get("compatible")?,
            &format!("{table_name}.compatible"),
        )?,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

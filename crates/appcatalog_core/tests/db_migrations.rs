use appcatalog_core::db::migrations::latest_version;
use appcatalog_core::db::{open_db, open_db_in_memory, open_db_with, DatabaseConfig, DbError};
use appcatalog_core::{default_repositories, RepositoryDao, SqliteRepositoryDao};
use rusqlite::Connection;

const CATALOG_TABLES: &[&str] = &[
    "repository",
    "product",
    "product_temp",
    "category",
    "category_temp",
    "product_release",
    "installed",
    "extras",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in CATALOG_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn temporary_tables_mirror_live_columns() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(columns(&conn, "product"), columns(&conn, "product_temp"));
    assert_eq!(columns(&conn, "category"), columns(&conn, "category_temp"));
}

#[test]
fn plain_open_does_not_seed_repositories() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "repository");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn destructive_fallback_rebuilds_unknown_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE legacy_blob (id INTEGER PRIMARY KEY, payload BLOB);
         CREATE INDEX idx_legacy_blob_payload ON legacy_blob(payload);
         CREATE VIEW legacy_view AS SELECT id FROM legacy_blob;
         CREATE TABLE product (package_name TEXT);
         INSERT INTO product (package_name) VALUES ('stale');
         PRAGMA user_version = 999;",
    )
    .unwrap();
    drop(conn);

    let config = DatabaseConfig {
        seed_default_repositories: false,
        ..DatabaseConfig::at_path(&path)
    };
    let conn = open_db_with(&config).unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert!(!table_exists(&conn, "legacy_blob"));
    for table in CATALOG_TABLES {
        assert_table_exists(&conn, table);
    }
    let products: i64 = conn
        .query_row("SELECT COUNT(*) FROM product;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(products, 0);
}

#[test]
fn destructive_fallback_drops_unknown_tables_with_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future_fk.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE a_parent (id INTEGER PRIMARY KEY);
         CREATE TABLE b_child (
             id INTEGER PRIMARY KEY,
             parent_id INTEGER NOT NULL REFERENCES a_parent(id)
         );
         INSERT INTO a_parent (id) VALUES (1);
         INSERT INTO b_child (id, parent_id) VALUES (1, 1);
         PRAGMA user_version = {};",
        latest_version() + 5
    ))
    .unwrap();
    drop(conn);

    let conn = open_db_with(&DatabaseConfig::at_path(&path)).unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert!(!table_exists(&conn, "a_parent"));
    assert!(!table_exists(&conn, "b_child"));
    let enforced: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enforced, 1);
    let repositories = SqliteRepositoryDao::try_new(&conn).unwrap();
    assert_eq!(repositories.count().unwrap(), default_repositories().len() as u64);
}

#[test]
fn runtime_config_seeds_default_repositories_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::in_directory(dir.path());

    let conn = open_db_with(&config).unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();
    let seeded = repo.all().unwrap();
    assert_eq!(seeded.len(), default_repositories().len());
    assert!(seeded.iter().all(|repository| repository.id.is_some()));
    let first_id = seeded[0].id.unwrap();
    repo.delete_by_id(seeded[1].id.unwrap()).unwrap();
    drop(conn);

    // A non-empty catalog is left alone on the next open.
    let conn = open_db_with(&config).unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap() as usize, default_repositories().len() - 1);
    assert!(repo.get(first_id).unwrap().is_some());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_exists(conn: &Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(table_exists(conn, table_name), "table {table_name} does not exist");
}

fn columns(conn: &Connection, table_name: &str) -> Vec<(String, String)> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table_name});"))
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut columns = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let name: String = row.get(1).unwrap();
        let kind: String = row.get(2).unwrap();
        columns.push((name, kind));
    }
    columns
}

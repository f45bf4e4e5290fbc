use appcatalog_core::db::open_db_in_memory;
use appcatalog_core::{
    clean_up, finish_temporary, Category, CategoryDao, CleanUpSummary, CleanUpTarget,
    ModelValidationError, Product, ProductDao, Release, ReleaseDao, RepoError, Repository,
    RepositoryDao, RepositoryId, SqliteCategoryDao, SqliteProductDao, SqliteReleaseDao,
    SqliteRepositoryDao, CLEAN_UP_WINDOW,
};
use rusqlite::Connection;

fn add_repository(conn: &Connection, address: &str) -> RepositoryId {
    let repo = SqliteRepositoryDao::try_new(conn).unwrap();
    let mut repository = Repository::new(address, address);
    repository.enabled = true;
    repo.put(&repository).unwrap()
}

fn fill_live(conn: &Connection, repository_id: RepositoryId, packages: &[&str]) {
    let products = SqliteProductDao::try_new(conn).unwrap();
    let categories = SqliteCategoryDao::try_new(conn).unwrap();
    for package in packages {
        products
            .insert(&[Product::new(repository_id, *package, *package)])
            .unwrap();
        categories
            .insert(&[Category::new(repository_id, *package, "Tools")])
            .unwrap();
    }
}

fn fill_temporary(conn: &Connection, repository_id: RepositoryId, packages: &[&str]) {
    let products = SqliteProductDao::try_new_temporary(conn).unwrap();
    let categories = SqliteCategoryDao::try_new_temporary(conn).unwrap();
    for package in packages {
        products
            .insert(&[Product::new(repository_id, *package, *package)])
            .unwrap();
        categories
            .insert(&[Category::new(repository_id, *package, "Staged")])
            .unwrap();
    }
}

fn live_packages(conn: &Connection, repository_id: RepositoryId) -> Vec<String> {
    SqliteProductDao::try_new(conn)
        .unwrap()
        .all()
        .unwrap()
        .into_iter()
        .filter(|product| product.repository_id == repository_id)
        .map(|product| product.package_name)
        .collect()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn clean_up_removes_catalog_rows_and_flagged_repositories() {
    let conn = open_db_in_memory().unwrap();
    let kept = add_repository(&conn, "https://kept.example/repo");
    let cleared = add_repository(&conn, "https://cleared.example/repo");
    let removed = add_repository(&conn, "https://removed.example/repo");
    fill_live(&conn, kept, &["org.kept.one"]);
    fill_live(&conn, cleared, &["org.cleared.one", "org.cleared.two"]);
    fill_live(&conn, removed, &["org.removed.one"]);
    SqliteReleaseDao::try_new(&conn)
        .unwrap()
        .insert(&[Release::new(cleared, "org.cleared.one", "1.0", 1)])
        .unwrap();

    let summary = clean_up(
        &conn,
        [CleanUpTarget::keep(cleared), CleanUpTarget::remove(removed)],
    )
    .unwrap();

    assert_eq!(
        summary,
        CleanUpSummary {
            products: 3,
            categories: 3,
            repositories: 1,
        }
    );
    assert_eq!(live_packages(&conn, kept), vec!["org.kept.one"]);
    assert!(live_packages(&conn, cleared).is_empty());

    let repositories = SqliteRepositoryDao::try_new(&conn).unwrap();
    assert!(repositories.get(cleared).unwrap().is_some());
    assert!(repositories.get(removed).unwrap().is_none());
    assert_eq!(count(&conn, "product_release"), 1);
}

#[test]
fn clean_up_with_no_targets_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let repository_id = add_repository(&conn, "https://kept.example/repo");
    fill_live(&conn, repository_id, &["org.kept.one"]);

    let summary = clean_up(&conn, Vec::new()).unwrap();

    assert_eq!(summary, CleanUpSummary::default());
    assert_eq!(count(&conn, "product"), 1);
}

#[test]
fn clean_up_spans_multiple_windows() {
    let conn = open_db_in_memory().unwrap();
    let total = CLEAN_UP_WINDOW * 2 + 3;
    let mut targets = Vec::new();
    for index in 0..total {
        let repository_id = add_repository(&conn, &format!("https://r{index}.example/repo"));
        fill_live(&conn, repository_id, &["org.example.app"]);
        targets.push(CleanUpTarget::remove(repository_id));
    }
    targets.push(targets[0]);

    let summary = clean_up(&conn, targets).unwrap();

    assert_eq!(summary.products, total);
    assert_eq!(summary.repositories, total);
    assert_eq!(count(&conn, "repository"), 0);
    assert_eq!(count(&conn, "category"), 0);
}

#[test]
fn clean_up_rolls_back_on_failure() {
    let conn = open_db_in_memory().unwrap();
    let repository_id = add_repository(&conn, "https://removed.example/repo");
    fill_live(&conn, repository_id, &["org.removed.one"]);
    conn.execute_batch(
        "CREATE TRIGGER block_repository_delete BEFORE DELETE ON repository
         BEGIN
             SELECT RAISE(ABORT, 'repository delete blocked');
         END;",
    )
    .unwrap();

    let err = clean_up(&conn, [CleanUpTarget::remove(repository_id)]).unwrap_err();

    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(count(&conn, "product"), 1);
    assert_eq!(count(&conn, "category"), 1);
    assert_eq!(count(&conn, "repository"), 1);
    assert!(conn.is_autocommit());
}

#[test]
fn finish_temporary_success_replaces_live_rows_and_stores_repository() {
    let conn = open_db_in_memory().unwrap();
    let synced = add_repository(&conn, "https://synced.example/repo");
    let other = add_repository(&conn, "https://other.example/repo");
    fill_live(&conn, synced, &["org.synced.old", "org.synced.kept"]);
    fill_live(&conn, other, &["org.other.one"]);
    fill_temporary(&conn, synced, &["org.synced.kept", "org.synced.new"]);

    let mut repository = SqliteRepositoryDao::try_new(&conn)
        .unwrap()
        .get(synced)
        .unwrap()
        .unwrap();
    repository.entity_tag = "\"etag-7\"".to_string();
    repository.updated = 1_700_000_000_000;

    let summary = finish_temporary(&conn, &repository, true).unwrap();

    assert_eq!(summary.products, 2);
    assert_eq!(summary.categories, 2);
    let mut synced_packages = live_packages(&conn, synced);
    synced_packages.sort();
    assert_eq!(synced_packages, vec!["org.synced.kept", "org.synced.new"]);
    assert_eq!(live_packages(&conn, other), vec!["org.other.one"]);

    let labels = SqliteCategoryDao::try_new(&conn)
        .unwrap()
        .for_product("org.synced.kept")
        .unwrap()
        .into_iter()
        .map(|category| category.label)
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["Staged"]);

    let stored = SqliteRepositoryDao::try_new(&conn)
        .unwrap()
        .get(synced)
        .unwrap()
        .unwrap();
    assert_eq!(stored, repository);
    assert_eq!(count(&conn, "product_temp"), 0);
    assert_eq!(count(&conn, "category_temp"), 0);
}

#[test]
fn finish_temporary_failure_discards_staging_only() {
    let conn = open_db_in_memory().unwrap();
    let synced = add_repository(&conn, "https://synced.example/repo");
    fill_live(&conn, synced, &["org.synced.old"]);
    fill_temporary(&conn, synced, &["org.synced.new"]);

    let mut repository = SqliteRepositoryDao::try_new(&conn)
        .unwrap()
        .get(synced)
        .unwrap()
        .unwrap();
    repository.name = "not stored".to_string();

    let summary = finish_temporary(&conn, &repository, false).unwrap();

    assert_eq!(summary.products, 0);
    assert_eq!(live_packages(&conn, synced), vec!["org.synced.old"]);
    assert_eq!(count(&conn, "product_temp"), 0);
    assert_eq!(count(&conn, "category_temp"), 0);
    let stored = SqliteRepositoryDao::try_new(&conn)
        .unwrap()
        .get(synced)
        .unwrap()
        .unwrap();
    assert_ne!(stored.name, "not stored");
}

#[test]
fn finish_temporary_requires_persisted_repository() {
    let conn = open_db_in_memory().unwrap();
    fill_temporary(&conn, 1, &["org.synced.new"]);

    let unsaved = Repository::new("https://new.example/repo", "New");
    let err = finish_temporary(&conn, &unsaved, true).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::MissingRepositoryId)
    ));
    assert_eq!(count(&conn, "product_temp"), 1);
}

#[test]
fn finish_temporary_rolls_back_on_failure() {
    let conn = open_db_in_memory().unwrap();
    let synced = add_repository(&conn, "https://synced.example/repo");
    fill_live(&conn, synced, &["org.synced.old"]);
    fill_temporary(&conn, synced, &["org.synced.new"]);
    conn.execute_batch(
        "CREATE TRIGGER block_category_insert BEFORE INSERT ON category
         BEGIN
             SELECT RAISE(ABORT, 'category insert blocked');
         END;",
    )
    .unwrap();

    let repository = SqliteRepositoryDao::try_new(&conn)
        .unwrap()
        .get(synced)
        .unwrap()
        .unwrap();
    let err = finish_temporary(&conn, &repository, true).unwrap_err();

    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(live_packages(&conn, synced), vec!["org.synced.old"]);
    assert_eq!(count(&conn, "category"), 1);
    assert_eq!(count(&conn, "product_temp"), 1);
    assert_eq!(count(&conn, "category_temp"), 1);
    assert!(conn.is_autocommit());
}

#[test]
fn operations_join_an_open_transaction() {
    let mut conn = open_db_in_memory().unwrap();
    let repository_id = add_repository(&conn, "https://removed.example/repo");
    fill_live(&conn, repository_id, &["org.removed.one"]);

    let tx = conn.transaction().unwrap();
    clean_up(&tx, [CleanUpTarget::remove(repository_id)]).unwrap();
    assert_eq!(count(&tx, "product"), 0);
    tx.rollback().unwrap();

    assert_eq!(count(&conn, "product"), 1);
    assert_eq!(count(&conn, "repository"), 1);
}

use appcatalog_core::db::migrations::latest_version;
use appcatalog_core::db::open_db_in_memory;
use appcatalog_core::{
    ModelValidationError, RepoError, Repository, RepositoryDao, SqliteRepositoryDao,
};
use rusqlite::Connection;

fn sample_repository(address: &str) -> Repository {
    let mut repository = Repository::new(address, "Sample");
    repository.mirrors = vec![format!("{address}/mirror")];
    repository.enabled = true;
    repository.fingerprint =
        "43238D512C1E5EB2D6569F4A3AFBF5523418B82E0A3ED1552770ABB9A9C9CCAB".to_string();
    repository
}

#[test]
fn put_assigns_id_and_get_roundtrips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let repository = sample_repository("https://example.org/repo");
    let id = repo.put(&repository).unwrap();

    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.address, repository.address);
    assert_eq!(loaded.mirrors, repository.mirrors);
    assert!(loaded.enabled);
    assert!(!loaded.deleted);
}

#[test]
fn put_with_id_replaces_existing_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let id = repo.put(&sample_repository("https://example.org/repo")).unwrap();
    let mut updated = repo.get(id).unwrap().unwrap();
    updated.name = "Renamed".to_string();
    updated.entity_tag = "\"etag-2\"".to_string();
    updated.timestamp = 1_700_000_000_000;

    assert_eq!(repo.put(&updated).unwrap(), id);
    assert_eq!(repo.count().unwrap(), 1);

    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(loaded, updated);
}

#[test]
fn put_rejects_invalid_repository() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let blank = Repository::new("", "Blank");
    let err = repo.put(&blank).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::BlankRepositoryAddress)
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn put_stores_normalized_fingerprint() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let mut repository = Repository::new("https://example.org/repo", "Separated");
    repository.fingerprint = "43:23:8d:51:2c:1e:5e:b2:d6:56:9f:4a:3a:fb:f5:52:\
                              34:18:b8:2e:0a:3e:d1:55:27:70:ab:b9:a9:c9:cc:ab"
        .to_string();
    let id = repo.put(&repository).unwrap();

    let loaded = repo.get(id).unwrap().unwrap();
    assert_eq!(
        loaded.fingerprint,
        "43238D512C1E5EB2D6569F4A3AFBF5523418B82E0A3ED1552770ABB9A9C9CCAB"
    );

    let mut truncated = repository.clone();
    truncated.fingerprint = "43:23:8d".to_string();
    assert!(matches!(
        repo.put(&truncated),
        Err(RepoError::Validation(ModelValidationError::InvalidFingerprint(_)))
    ));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn enabled_skips_disabled_and_tombstoned_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let first = repo.put(&sample_repository("https://one.example/repo")).unwrap();
    let second = repo.put(&sample_repository("https://two.example/repo")).unwrap();
    let third = repo.put(&sample_repository("https://three.example/repo")).unwrap();

    repo.set_enabled(second, false).unwrap();
    repo.mark_as_deleted(third).unwrap();

    let enabled = repo.enabled().unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].id, Some(first));

    let tombstoned = repo.get(third).unwrap().unwrap();
    assert!(tombstoned.deleted);
    assert!(!tombstoned.enabled);
    assert_eq!(repo.all().unwrap().len(), 3);
}

#[test]
fn updates_of_missing_rows_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    assert!(matches!(
        repo.set_enabled(42, true),
        Err(RepoError::NotFound { table: "repository", .. })
    ));
    assert!(matches!(
        repo.mark_as_deleted(42),
        Err(RepoError::NotFound { table: "repository", .. })
    ));
    assert!(!repo.delete_by_id(42).unwrap());
}

#[test]
fn delete_by_ids_removes_listed_rows_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let first = repo.put(&sample_repository("https://one.example/repo")).unwrap();
    let second = repo.put(&sample_repository("https://two.example/repo")).unwrap();
    let third = repo.put(&sample_repository("https://three.example/repo")).unwrap();

    assert_eq!(repo.delete_by_ids(&[first, third, 999]).unwrap(), 2);
    assert_eq!(repo.delete_by_ids(&[]).unwrap(), 0);

    let remaining = repo.all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, Some(second));
}

#[test]
fn corrupted_mirror_list_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepositoryDao::try_new(&conn).unwrap();

    let id = repo.put(&sample_repository("https://example.org/repo")).unwrap();
    conn.execute(
        "UPDATE repository SET mirrors = 'not json' WHERE id = ?1;",
        [id],
    )
    .unwrap();

    assert!(matches!(repo.get(id), Err(RepoError::InvalidData(_))));
}

#[test]
fn dao_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteRepositoryDao::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn dao_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE repository (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteRepositoryDao::try_new(&conn),
        Err(RepoError::MissingRequiredColumn {
            table: "repository",
            column: "mirrors"
        })
    ));
}

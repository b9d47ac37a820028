use classdesk_core::db::{
    open_db, open_db_in_memory, schema_version, DbError, STORAGE_SCHEMA_VERSION,
};
use classdesk_core::{SqliteBackend, StorageBackend};
use rusqlite::Connection;

const STORAGE_ITEMS_V1: &str = "CREATE TABLE storage_items (
    item_key TEXT PRIMARY KEY NOT NULL,
    item_value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT 0
);";

#[test]
fn fresh_database_gets_current_schema_and_namespace_index() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), STORAGE_SCHEMA_VERSION);
    assert_eq!(sqlite_object_count(&conn, "table", "storage_items"), 1);
    assert_eq!(
        sqlite_object_count(&conn, "index", "idx_storage_items_namespace"),
        1
    );
}

#[test]
fn version_one_file_is_upgraded_and_namespace_backfilled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(STORAGE_ITEMS_V1).unwrap();
    conn.execute_batch(
        "INSERT INTO storage_items (item_key, item_value) VALUES
            ('school:accounts', '[]'),
            ('school:posts', '[]'),
            ('loose', '1');
         PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), STORAGE_SCHEMA_VERSION);
    let namespace_of = |key: &str| -> String {
        conn.query_row(
            "SELECT namespace FROM storage_items WHERE item_key = ?1;",
            [key],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(namespace_of("school:accounts"), "school");
    assert_eq!(namespace_of("school:posts"), "school");
    assert_eq!(namespace_of("loose"), "");
}

#[test]
fn reopening_current_file_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classdesk.db");

    let mut backend = SqliteBackend::open(&path).unwrap();
    backend.set_item("school:roster", "[1]").unwrap();
    drop(backend);

    let backend = SqliteBackend::open(&path).unwrap();
    assert_eq!(
        backend.get_item("school:roster").unwrap().as_deref(),
        Some("[1]")
    );
    assert_eq!(
        schema_version(backend.connection()).unwrap(),
        STORAGE_SCHEMA_VERSION
    );
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, STORAGE_SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn table_missing_namespace_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("half.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(STORAGE_ITEMS_V1).unwrap();
    conn.execute_batch("PRAGMA user_version = 2;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::StorageTableIncomplete { column: "namespace" }
    ));
    assert!(err.to_string().contains("namespace"));
}

#[test]
fn namespace_keys_only_lists_own_namespace() {
    let mut backend = SqliteBackend::open_in_memory().unwrap();
    backend.set_item("school-a:accounts", "[]").unwrap();
    backend.set_item("school-a:posts", "[]").unwrap();
    backend.set_item("school-b:accounts", "[]").unwrap();
    backend.set_item("school-ab", "0").unwrap();

    assert_eq!(
        backend.namespace_keys("school-a").unwrap(),
        vec!["school-a:accounts".to_string(), "school-a:posts".to_string()]
    );
    assert!(backend.namespace_keys("missing").unwrap().is_empty());
}

fn sqlite_object_count(conn: &Connection, kind: &str, name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2;",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}

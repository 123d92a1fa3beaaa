use notekeep_core::db::migrations::{latest_version, migrate, schema_version};
use notekeep_core::db::{open_db, open_db_in_memory};
use notekeep_core::{KeyValueStore, SqliteKeyValueStore, StorageError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn migrate_is_a_no_op_on_current_schema() {
    let mut conn = open_db_in_memory().unwrap();
    assert_eq!(migrate(&mut conn).unwrap(), latest_version());
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notekeep.db");

    let first = SqliteKeyValueStore::open(&path).unwrap();
    first.set_item("k", "v").unwrap();
    drop(first);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let store = SqliteKeyValueStore::try_new(conn).unwrap();
    assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v"));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        StorageError::UnsupportedSchemaVersion { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = SqliteKeyValueStore::open(&path).err().unwrap();
    assert!(err.to_string().contains("newer than supported"), "{err}");
    assert_eq!(schema_version(&Connection::open(&path).unwrap()).unwrap(), 999);
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing table {table_name}");
}

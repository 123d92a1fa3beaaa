//! SQLite-backed key-value store.
//!
//! # Invariants
//! - One row per key in `kv_entries`; `set_item` is a single upsert.
//! - Quota is checked before touching the table.

use super::{check_quota, KeyValueStore, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const KV_TABLE: &str = "kv_entries";

/// Durable store over a migrated SQLite connection.
pub struct SqliteKeyValueStore {
    conn: Connection,
    quota_bytes: Option<usize>,
}

impl SqliteKeyValueStore {
    /// Wraps an existing connection after checking the required table exists.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        ensure_kv_table(&conn)?;
        Ok(Self {
            conn,
            quota_bytes: None,
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Rejects writes whose value is larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Borrow of the underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        check_quota(self.quota_bytes, value)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

fn ensure_kv_table(conn: &Connection) -> StorageResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [KV_TABLE],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(StorageError::MissingRequiredTable(KV_TABLE))
    }
}

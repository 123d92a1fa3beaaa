//! Connection bootstrap for SQLite.
//!
//! # Invariants
//! - Returned connections are migrated to `migrations::latest_version()`.
//! - Returned connections wait up to `BUSY_TIMEOUT` on a locked file instead
//!   of failing immediately.

use super::migrations;
use crate::storage::{StorageError, StorageResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating when missing) a SQLite file ready for the key-value store.
pub fn open_db(path: impl AsRef<Path>) -> StorageResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory database ready for the key-value store.
pub fn open_db_in_memory() -> StorageResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> StorageResult<Connection> {
    let started_at = Instant::now();
    let prepared: StorageResult<(Connection, u32)> = connect()
        .map_err(StorageError::from)
        .and_then(|mut conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            let version = migrations::migrate(&mut conn)?;
            Ok((conn, version))
        });

    match prepared {
        Ok((conn, version)) => {
            info!(
                "event=db_open module=db status=ok mode={mode} schema_version={version} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

//! Ordered schema steps for the key-value engine table.
//!
//! # Invariants
//! - Step versions are strictly increasing, starting at 1.
//! - A database is moved to the latest version in one transaction, and the
//!   reached version is written to `PRAGMA user_version`.
//! - A database stamped newer than this binary is refused, never touched.

use crate::storage::{StorageError, StorageResult};
use log::info;
use rusqlite::Connection;

/// `(version, sql)` pairs in application order.
const STEPS: &[(u32, &str)] = &[(1, include_str!("0001_kv_entries.sql"))];

/// Highest schema version this binary can produce.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Reads the version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> StorageResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Runs every step newer than the stamped version; returns the version
/// reached.
pub fn migrate(conn: &mut Connection) -> StorageResult<u32> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(StorageError::UnsupportedSchemaVersion { found, supported });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(version, _)| *version > found).collect();
    if pending.is_empty() {
        return Ok(found);
    }

    let tx = conn.transaction()?;
    for (version, sql) in &pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={found} to_version={supported} steps={}",
        pending.len()
    );
    Ok(supported)
}

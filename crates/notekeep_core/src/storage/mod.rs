//! Durable key-value storage seam.
//!
//! # Responsibility
//! - Define the `KeyValueStore` contract the persistence adapter writes to.
//! - Provide SQLite, in-memory and unavailable implementations.
//!
//! # Invariants
//! - `set_item` replaces the whole value for a key in one write; a failed
//!   write leaves the previous value intact.
//! - A key that was never written reads as `None`, not as an error.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::{MemoryKeyValueStore, UnavailableKeyValueStore};
pub use sqlite::SqliteKeyValueStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of the underlying durable medium.
#[derive(Debug)]
pub enum StorageError {
    /// No durable medium in this execution context.
    Unavailable,
    /// Value would exceed the configured size quota.
    QuotaExceeded {
        limit_bytes: usize,
        attempted_bytes: usize,
    },
    /// Connection is missing a table the store requires.
    MissingRequiredTable(&'static str),
    /// Database file was written by a newer binary.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    Sqlite(rusqlite::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage is unavailable in this context"),
            Self::QuotaExceeded {
                limit_bytes,
                attempted_bytes,
            } => write!(
                f,
                "storage quota exceeded: {attempted_bytes} bytes requested, limit is {limit_bytes}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "storage schema version {found} is newer than supported {supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// String key-value medium holding serialized application state.
pub trait KeyValueStore {
    /// Reads the value for `key`, `None` when never written.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    /// Replaces the value for `key` atomically.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
}

pub(crate) fn check_quota(limit: Option<usize>, value: &str) -> StorageResult<()> {
    match limit {
        Some(limit_bytes) if value.len() > limit_bytes => Err(StorageError::QuotaExceeded {
            limit_bytes,
            attempted_bytes: value.len(),
        }),
        _ => Ok(()),
    }
}

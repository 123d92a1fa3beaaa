//! Non-durable key-value stores.

use super::{check_quota, KeyValueStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-local store. Clones share the same entries, which lets tests model
/// several execution contexts writing one durable key.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects writes whose value is larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        check_quota(self.quota_bytes, value)?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stand-in for contexts without any durable medium; every call fails with
/// `StorageError::Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableKeyValueStore;

impl KeyValueStore for UnavailableKeyValueStore {
    fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable)
    }
}

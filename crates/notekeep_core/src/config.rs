//! Runtime configuration resolved from the environment.
//!
//! # Invariants
//! - Blank variables behave as unset.
//! - Logging stays disabled unless `NOTEKEEP_LOG_DIR` is set.

use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::repo::note_repo::{KvNoteRepository, DEFAULT_STORAGE_KEY};
use crate::service::note_store::NoteStore;
use crate::storage::{SqliteKeyValueStore, StorageResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "NOTEKEEP_DB_PATH";
pub const ENV_STORAGE_KEY: &str = "NOTEKEEP_STORAGE_KEY";
pub const ENV_LOG_LEVEL: &str = "NOTEKEEP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTEKEEP_LOG_DIR";
pub const ENV_QUOTA_BYTES: &str = "NOTEKEEP_QUOTA_BYTES";

const DEFAULT_DB_FILE_NAME: &str = "notekeep.sqlite3";

/// Store wired to the SQLite key-value backend.
pub type SqliteNoteStore = NoteStore<KvNoteRepository<SqliteKeyValueStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid {var}=`{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub storage_key: String,
    pub log_level: String,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Maximum serialized collection size; `None` is unlimited.
    pub quota_bytes: Option<usize>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            quota_bytes: None,
        }
    }
}

impl CoreConfig {
    /// Reads `NOTEKEEP_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(key) = read(ENV_STORAGE_KEY) {
            config.storage_key = key;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(raw) = read(ENV_QUOTA_BYTES) {
            let bytes = raw
                .parse::<usize>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: ENV_QUOTA_BYTES,
                    value: raw.clone(),
                    reason: "expected a positive byte count",
                })?;
            config.quota_bytes = Some(bytes);
        }
        Ok(config)
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match self.log_dir.as_ref() {
            Some(dir) => init_logging(&self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }

    /// Opens the SQLite backend and returns an initialized store.
    pub fn open_store(&self) -> StorageResult<SqliteNoteStore> {
        let mut kv = SqliteKeyValueStore::open(&self.db_path)?;
        if let Some(bytes) = self.quota_bytes {
            kv = kv.with_quota(bytes);
        }
        let repo = KvNoteRepository::new(kv).with_storage_key(self.storage_key.clone());
        Ok(NoteStore::open(repo))
    }
}

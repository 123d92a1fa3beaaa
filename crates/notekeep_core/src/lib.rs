//! Core domain logic for NoteKeep.
//! This crate owns the notes collection, its durable representation, and
//! the in-memory state callers observe.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig, SqliteNoteStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteDraft, NoteId, NoteValidationError, PREVIEW_DEFAULT_CHARS};
pub use repo::note_repo::{
    KvNoteRepository, NoteAction, NoteRepository, PersistenceCause, PersistenceError, RepoError,
    RepoResult, DEFAULT_STORAGE_KEY,
};
pub use service::note_store::{NoteState, NoteStore, StateListener};
pub use storage::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult,
    UnavailableKeyValueStore,
};

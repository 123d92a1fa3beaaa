//! Note repository contract and key-value implementation.
//!
//! # Responsibility
//! - Load, create, delete and update notes stored as one JSON array under a
//!   single key.
//! - Assign `id`/`created_at` on create and `last_updated` on update.
//!
//! # Invariants
//! - New notes are prepended (most-recent-first).
//! - `id` and `created_at` are never rewritten by `update`.
//! - `last_updated` never moves backwards for one note.
//! - A failed write leaves the durable value untouched.

use crate::clock::{Clock, SystemClock};
use crate::model::note::{Note, NoteDraft, NoteId};
use crate::storage::{KeyValueStore, StorageError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Durable key used when callers do not configure one.
pub const DEFAULT_STORAGE_KEY: &str = "note-service-notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository operation a persistence failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    Load,
    Create,
    Update,
    Delete,
}

impl NoteAction {
    /// User-facing headline for a failure of this action.
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load notes",
            Self::Create => "Failed to save note",
            Self::Update => "Failed to update note",
            Self::Delete => "Failed to delete note",
        }
    }

    fn event(self) -> &'static str {
        match self {
            Self::Load => "notes_load",
            Self::Create => "note_create",
            Self::Update => "note_update",
            Self::Delete => "note_delete",
        }
    }
}

/// Underlying reason for a `PersistenceError`.
#[derive(Debug)]
pub enum PersistenceCause {
    Storage(StorageError),
    /// Collection could not be serialized.
    Encode(serde_json::Error),
    /// Stored value is not a valid notes array.
    Decode(serde_json::Error),
}

impl Display for PersistenceCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "could not encode notes: {err}"),
            Self::Decode(err) => write!(f, "stored notes are corrupted: {err}"),
        }
    }
}

/// Durable store could not be read or written.
#[derive(Debug)]
pub struct PersistenceError {
    pub action: NoteAction,
    pub cause: PersistenceCause,
}

impl PersistenceError {
    fn new(action: NoteAction, cause: PersistenceCause) -> Self {
        Self { action, cause }
    }

    /// Whether the stored value itself is unparseable.
    pub fn is_corrupted(&self) -> bool {
        matches!(self.cause, PersistenceCause::Decode(_))
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.action.failure_message(), self.cause)
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            PersistenceCause::Storage(err) => Some(err),
            PersistenceCause::Encode(err) | PersistenceCause::Decode(err) => Some(err),
        }
    }
}

/// Repository error for note persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Persistence(PersistenceError),
    /// `update` targeted an id that is not in the collection.
    NotFound(NoteId),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "Note not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<PersistenceError> for RepoError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Repository interface for the notes collection.
pub trait NoteRepository {
    /// Loads the collection; unavailable storage reads as empty, unreadable
    /// or corrupted storage is an error.
    fn try_load_all(&self) -> RepoResult<Vec<Note>>;

    /// Prepends a new note built from `draft` and returns it.
    fn create(&self, draft: &NoteDraft) -> RepoResult<Note>;

    /// Removes the note with `id`; returns whether anything was removed.
    fn delete(&self, id: &NoteId) -> RepoResult<bool>;

    /// Replaces title/content of the note with `id` and stamps `last_updated`.
    fn update(&self, id: &NoteId, draft: &NoteDraft) -> RepoResult<Note>;

    /// Loads the collection, degrading every failure to an empty list.
    fn load_all(&self) -> Vec<Note> {
        match self.try_load_all() {
            Ok(notes) => notes,
            Err(err) => {
                error!("event=notes_load module=repo status=degraded error={err}");
                Vec::new()
            }
        }
    }
}

/// Notes repository over any `KeyValueStore`.
pub struct KvNoteRepository<S, C = SystemClock> {
    store: S,
    clock: C,
    storage_key: String,
}

impl<S: KeyValueStore> KvNoteRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> KvNoteRepository<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    /// Overrides the durable key holding the collection.
    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_str()
    }

    fn read_collection(&self, action: NoteAction) -> Result<Vec<Note>, PersistenceError> {
        let raw = match self.store.get_item(&self.storage_key) {
            Ok(raw) => raw,
            Err(StorageError::Unavailable) => {
                debug!(
                    "event={} module=repo status=skipped reason=storage_unavailable",
                    action.event()
                );
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(PersistenceError::new(
                    action,
                    PersistenceCause::Storage(err),
                ))
            }
        };

        match raw {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .map_err(|err| PersistenceError::new(action, PersistenceCause::Decode(err))),
            _ => Ok(Vec::new()),
        }
    }

    /// Reads the collection for a mutation. A corrupted value is replaced by
    /// the next write, same as a fresh store.
    fn read_for_write(&self, action: NoteAction) -> Result<Vec<Note>, PersistenceError> {
        match self.read_collection(action) {
            Err(err) if err.is_corrupted() => {
                warn!(
                    "event={} module=repo status=degraded reason=corrupted_collection error={}",
                    action.event(),
                    err
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn write_collection(&self, action: NoteAction, notes: &[Note]) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(notes)
            .map_err(|err| PersistenceError::new(action, PersistenceCause::Encode(err)))?;
        self.store
            .set_item(&self.storage_key, &encoded)
            .map_err(|err| PersistenceError::new(action, PersistenceCause::Storage(err)))
    }

    fn run<T>(
        &self,
        action: NoteAction,
        op: impl FnOnce() -> RepoResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        match op() {
            Ok(value) => {
                info!(
                    "event={} module=repo status=ok duration_ms={} {}",
                    action.event(),
                    started_at.elapsed().as_millis(),
                    describe(&value)
                );
                Ok(value)
            }
            Err(err) => {
                let error_code = if err.is_not_found() {
                    "not_found"
                } else {
                    "persistence_failed"
                };
                error!(
                    "event={} module=repo status=error duration_ms={} error_code={} error={}",
                    action.event(),
                    started_at.elapsed().as_millis(),
                    error_code,
                    err
                );
                Err(err)
            }
        }
    }
}

impl<S: KeyValueStore, C: Clock> NoteRepository for KvNoteRepository<S, C> {
    fn try_load_all(&self) -> RepoResult<Vec<Note>> {
        self.run(
            NoteAction::Load,
            || Ok(self.read_collection(NoteAction::Load)?),
            |notes| format!("count={}", notes.len()),
        )
    }

    fn create(&self, draft: &NoteDraft) -> RepoResult<Note> {
        self.run(
            NoteAction::Create,
            || {
                let mut notes = self.read_for_write(NoteAction::Create)?;
                let mut id = NoteId::generate();
                while notes.iter().any(|note| note.id == id) {
                    id = NoteId::generate();
                }
                let note = Note {
                    id,
                    title: draft.title.clone(),
                    content: draft.content.clone(),
                    created_at: self.clock.now_ms(),
                    last_updated: None,
                };
                notes.insert(0, note.clone());
                self.write_collection(NoteAction::Create, &notes)?;
                Ok(note)
            },
            |note| format!("note_id={}", note.id),
        )
    }

    fn delete(&self, id: &NoteId) -> RepoResult<bool> {
        self.run(
            NoteAction::Delete,
            || {
                let mut notes = self.read_for_write(NoteAction::Delete)?;
                let before = notes.len();
                notes.retain(|note| &note.id != id);
                let removed = notes.len() != before;
                self.write_collection(NoteAction::Delete, &notes)?;
                Ok(removed)
            },
            |removed| format!("note_id={id} removed={removed}"),
        )
    }

    fn update(&self, id: &NoteId, draft: &NoteDraft) -> RepoResult<Note> {
        self.run(
            NoteAction::Update,
            || {
                let mut notes = self.read_for_write(NoteAction::Update)?;
                let Some(slot) = notes.iter_mut().find(|note| &note.id == id) else {
                    return Err(RepoError::NotFound(id.clone()));
                };

                let floor = slot.last_updated.unwrap_or(slot.created_at);
                slot.title = draft.title.clone();
                slot.content = draft.content.clone();
                slot.last_updated = Some(self.clock.now_ms().max(floor));
                let updated = slot.clone();

                self.write_collection(NoteAction::Update, &notes)?;
                Ok(updated)
            },
            |note| format!("note_id={}", note.id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteAction, PersistenceCause, PersistenceError, RepoError};
    use crate::model::note::NoteId;
    use crate::storage::StorageError;

    #[test]
    fn persistence_error_message_leads_with_action_headline() {
        let err = RepoError::from(PersistenceError {
            action: NoteAction::Create,
            cause: PersistenceCause::Storage(StorageError::Unavailable),
        });
        assert!(err.to_string().starts_with("Failed to save note"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_message_names_the_id() {
        let err = RepoError::NotFound(NoteId::from("abc"));
        assert_eq!(err.to_string(), "Note not found: abc");
        assert!(err.is_not_found());
    }
}

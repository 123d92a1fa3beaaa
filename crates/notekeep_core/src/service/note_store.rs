//! In-memory notes state synchronized with the persistence adapter.
//!
//! # Responsibility
//! - Own the observable `NoteState` (`notes`, `loading`, `error`).
//! - Delegate add/remove/edit to a `NoteRepository` and apply only what the
//!   repository returned.
//! - Notify subscribers after every state change.
//!
//! # Invariants
//! - Mutations are single-flight: the repository sits behind one mutex, so a
//!   read-modify-write finishes before the next one reads.
//! - `loading` is reset on every exit path, including failures and panics.
//! - After a successful mutation, `notes` equals what was just persisted.
//!   When memory is known to be out of date (failed load, edit of a note
//!   memory never saw), the mutation reloads the collection instead of
//!   patching memory.
//! - `error` is cleared when an operation starts and set only on failure.

use crate::model::note::{Note, NoteDraft, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoResult};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Callback invoked with the new state after each change.
///
/// Listeners are called with no store lock held except the single-flight
/// gate, so they may read the store or `subscribe`, but must not call
/// `add`/`remove`/`edit`/`load`.
pub type StateListener = Arc<dyn Fn(&NoteState) + Send + Sync>;

/// Snapshot of the store state observed by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteState {
    /// Most-recent-first, mirroring the persisted order.
    pub notes: Vec<Note>,
    /// True only while a mutation is in flight.
    pub loading: bool,
    /// Message of the most recent failed operation.
    pub error: Option<String>,
}

/// Application-wide notes controller.
///
/// Construct once at startup and share it (`Arc<NoteStore<_>>`); there is no
/// global instance.
pub struct NoteStore<R> {
    repo: Mutex<R>,
    state: RwLock<NoteState>,
    listeners: RwLock<Vec<StateListener>>,
    /// Set while `notes` may not match the durable collection.
    stale: AtomicBool,
}

impl<R: NoteRepository> NoteStore<R> {
    /// Creates an empty store without touching storage.
    pub fn new(repo: R) -> Self {
        Self {
            repo: Mutex::new(repo),
            state: RwLock::new(NoteState::default()),
            listeners: RwLock::new(Vec::new()),
            stale: AtomicBool::new(false),
        }
    }

    /// Creates a store and runs the initial load.
    ///
    /// A failed load is recorded in `error`; the store stays usable and the
    /// next successful mutation reloads the collection.
    pub fn open(repo: R) -> Self {
        let store = Self::new(repo);
        let _ = store.load();
        store
    }

    /// Replaces in-memory notes with the persisted collection.
    ///
    /// On failure the current notes are kept, `error` is set, and memory is
    /// marked out of date.
    pub fn load(&self) -> RepoResult<usize> {
        let repo = self.lock_repo();
        self.update_state(|state| state.error = None);

        match repo.try_load_all() {
            Ok(notes) => {
                let count = notes.len();
                info!("event=store_load module=service status=ok count={count}");
                self.stale.store(false, Ordering::SeqCst);
                self.update_state(|state| state.notes = notes);
                Ok(count)
            }
            Err(err) => {
                warn!("event=store_load module=service status=error error={err}");
                self.stale.store(true, Ordering::SeqCst);
                self.record_failure(&err.to_string());
                Err(err)
            }
        }
    }

    /// Persists a new note and prepends it to `notes`.
    pub fn add(&self, draft: &NoteDraft) -> RepoResult<Note> {
        let repo = self.lock_repo();
        let _in_flight = self.begin();

        match repo.create(draft) {
            Ok(note) => {
                if !self.resync_if_stale(&repo) {
                    self.update_state(|state| state.notes.insert(0, note.clone()));
                }
                Ok(note)
            }
            Err(err) => {
                self.record_failure(&err.to_string());
                Err(err)
            }
        }
    }

    /// Deletes a note; returns whether the durable collection contained it.
    ///
    /// Never fails: a persistence error is recorded in `error`, the note stays
    /// visible, and `false` is returned.
    pub fn remove(&self, id: &NoteId) -> bool {
        let repo = self.lock_repo();
        let _in_flight = self.begin();

        match repo.delete(id) {
            Ok(removed) => {
                if !self.resync_if_stale(&repo) {
                    self.update_state(|state| state.notes.retain(|note| &note.id != id));
                }
                removed
            }
            Err(err) => {
                self.record_failure(&err.to_string());
                false
            }
        }
    }

    /// Persists new title/content and swaps the in-memory note in place.
    pub fn edit(&self, id: &NoteId, draft: &NoteDraft) -> RepoResult<Note> {
        let repo = self.lock_repo();
        let _in_flight = self.begin();

        match repo.update(id, draft) {
            Ok(updated) => {
                if self.resync_if_stale(&repo) {
                    return Ok(updated);
                }
                let replaced = self.update_state(|state| {
                    match state.notes.iter_mut().find(|note| &note.id == id) {
                        Some(slot) => {
                            *slot = updated.clone();
                            true
                        }
                        None => false,
                    }
                });
                if !replaced {
                    // Written by another context since our last load.
                    warn!("event=store_edit module=service status=resync note_id={id}");
                    self.stale.store(true, Ordering::SeqCst);
                    self.resync_if_stale(&repo);
                }
                Ok(updated)
            }
            Err(err) => {
                self.record_failure(&err.to_string());
                Err(err)
            }
        }
    }

    /// Registers a listener called after every state change.
    pub fn subscribe(&self, listener: impl Fn(&NoteState) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    pub fn snapshot(&self) -> NoteState {
        self.read_state(NoteState::clone)
    }

    pub fn notes(&self) -> Vec<Note> {
        self.read_state(|state| state.notes.clone())
    }

    /// Looks up one note in memory.
    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.read_state(|state| state.notes.iter().find(|note| &note.id == id).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.read_state(|state| state.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.read_state(|state| state.error.clone())
    }

    pub fn clear_error(&self) {
        self.update_state(|state| state.error = None);
    }

    fn lock_repo(&self) -> MutexGuard<'_, R> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> InFlight<'_, R> {
        let guard = InFlight { store: self };
        self.update_state(|state| {
            state.loading = true;
            state.error = None;
        });
        guard
    }

    /// Reloads `notes` when marked out of date. Returns `true` when memory was
    /// replaced by the persisted collection.
    ///
    /// Caller must hold the single-flight gate.
    fn resync_if_stale(&self, repo: &R) -> bool {
        if !self.stale.load(Ordering::SeqCst) {
            return false;
        }
        match repo.try_load_all() {
            Ok(notes) => {
                info!(
                    "event=store_resync module=service status=ok count={}",
                    notes.len()
                );
                self.stale.store(false, Ordering::SeqCst);
                self.update_state(|state| state.notes = notes);
                true
            }
            Err(err) => {
                warn!("event=store_resync module=service status=error error={err}");
                false
            }
        }
    }

    fn record_failure(&self, message: &str) {
        self.update_state(|state| state.error = Some(message.to_string()));
    }
}

impl<R> NoteStore<R> {
    fn read_state<T>(&self, f: impl FnOnce(&NoteState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state<T>(&self, f: impl FnOnce(&mut NoteState) -> T) -> (T, NoteState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state);
        (result, state.clone())
    }

    fn update_state<T>(&self, f: impl FnOnce(&mut NoteState) -> T) -> T {
        let (result, snapshot) = self.write_state(f);
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&snapshot);
        }
        result
    }
}

/// Resets `loading` when the operation scope ends.
struct InFlight<'a, R> {
    store: &'a NoteStore<R>,
}

impl<R> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // A listener may be what panicked; do not call it again.
            self.store.write_state(|state| state.loading = false);
        } else {
            self.store.update_state(|state| state.loading = false);
        }
    }
}

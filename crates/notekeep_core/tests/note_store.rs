use notekeep_core::{
    KeyValueStore, KvNoteRepository, ManualClock, MemoryKeyValueStore, NoteDraft, NoteId,
    NoteRepository, NoteStore, RepoError, StorageError, StorageResult, UnavailableKeyValueStore,
    DEFAULT_STORAGE_KEY,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

type MemoryStore = NoteStore<KvNoteRepository<MemoryKeyValueStore, Arc<ManualClock>>>;

fn open_store(kv: &MemoryKeyValueStore, clock: &Arc<ManualClock>) -> MemoryStore {
    NoteStore::open(KvNoteRepository::with_clock(kv.clone(), clock.clone()))
}

fn persisted(kv: &MemoryKeyValueStore) -> Vec<notekeep_core::Note> {
    KvNoteRepository::new(kv.clone()).load_all()
}

/// Memory store whose first read fails, like a medium that comes up late.
struct FailsFirstRead {
    inner: MemoryKeyValueStore,
    failed: AtomicBool,
}

impl KeyValueStore for FailsFirstRead {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(StorageError::MissingRequiredTable("kv_entries"));
        }
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.inner.set_item(key, value)
    }
}

#[test]
fn groceries_todo_scenario_keeps_memory_and_storage_in_step() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let store = open_store(&kv, &clock);
    assert!(store.notes().is_empty());
    assert_eq!(store.error(), None);

    let a = store
        .add(&NoteDraft::new("Groceries", "Milk, eggs"))
        .unwrap();
    assert_eq!(store.notes(), vec![a.clone()]);
    assert_eq!(persisted(&kv), store.notes());

    clock.advance(10);
    let b = store.add(&NoteDraft::new("Todo", "Write spec")).unwrap();
    assert_eq!(store.notes(), vec![b.clone(), a.clone()]);
    assert_eq!(persisted(&kv), store.notes());

    assert!(store.remove(&a.id));
    assert_eq!(store.notes(), vec![b.clone()]);
    assert_eq!(persisted(&kv), store.notes());

    clock.advance(10);
    let b2 = store
        .edit(&b.id, &NoteDraft::new("Todo", "Write spec v2"))
        .unwrap();
    assert_eq!(b2.content, "Write spec v2");
    assert_eq!(b2.created_at, b.created_at);
    assert!(b2.last_updated.is_some());
    assert_eq!(store.notes(), vec![b2]);
    assert_eq!(persisted(&kv), store.notes());
    assert!(!store.is_loading());
}

#[test]
fn open_loads_existing_collection() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let first = open_store(&kv, &clock);
    let note = first.add(&NoteDraft::new("persisted", "body")).unwrap();

    let second = open_store(&kv, &clock);
    assert_eq!(second.notes(), vec![note.clone()]);
    assert_eq!(second.get(&note.id), Some(note));
}

#[test]
fn failed_initial_load_sets_error_and_store_stays_usable() {
    let kv = MemoryKeyValueStore::new();
    kv.set_item(DEFAULT_STORAGE_KEY, "not-json").unwrap();
    let clock = Arc::new(ManualClock::new(1_000));

    let store = open_store(&kv, &clock);
    assert!(store.notes().is_empty());
    let error = store.error().unwrap();
    assert!(error.starts_with("Failed to load notes"), "{error}");

    let created = store.add(&NoteDraft::new("recovered", "yes")).unwrap();
    assert_eq!(store.error(), None);
    assert_eq!(store.notes(), vec![created.clone()]);
    assert_eq!(persisted(&kv), vec![created]);
}

#[test]
fn unavailable_storage_opens_empty_and_reports_failed_save() {
    let store = NoteStore::open(KvNoteRepository::new(UnavailableKeyValueStore));
    assert!(store.notes().is_empty());
    assert_eq!(store.error(), None);

    let err = store.add(&NoteDraft::new("t", "c")).unwrap_err();
    assert!(matches!(err, RepoError::Persistence(_)));
    assert!(store.error().unwrap().starts_with("Failed to save note"));
    assert!(store.notes().is_empty());
    assert!(!store.is_loading());
}

#[test]
fn failed_save_leaves_memory_and_storage_unchanged() {
    let kv = MemoryKeyValueStore::new().with_quota(256);
    let store = NoteStore::open(KvNoteRepository::new(kv.clone()));
    let kept = store.add(&NoteDraft::new("small", "fits")).unwrap();

    let err = store
        .add(&NoteDraft::new("huge", "x".repeat(1_024)))
        .unwrap_err();
    assert!(err.to_string().starts_with("Failed to save note"));
    assert_eq!(store.error(), Some(err.to_string()));
    assert_eq!(store.notes(), vec![kept.clone()]);
    assert_eq!(persisted(&kv), vec![kept]);
    assert!(!store.is_loading());
}

#[test]
fn failed_edit_keeps_old_note_and_reports_error() {
    let kv = MemoryKeyValueStore::new().with_quota(256);
    let store = NoteStore::open(KvNoteRepository::new(kv.clone()));
    let original = store.add(&NoteDraft::new("title", "short")).unwrap();

    let err = store
        .edit(&original.id, &NoteDraft::new("title", "y".repeat(1_024)))
        .unwrap_err();
    assert!(err.to_string().starts_with("Failed to update note"));
    assert_eq!(store.notes(), vec![original.clone()]);
    assert_eq!(persisted(&kv), vec![original]);
}

#[test]
fn edit_of_missing_id_is_not_found_and_changes_nothing() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let store = open_store(&kv, &clock);
    let note = store.add(&NoteDraft::new("a", "b")).unwrap();

    let err = store
        .edit(&NoteId::from("ghost"), &NoteDraft::new("x", "y"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.error().as_deref(), Some("Note not found: ghost"));
    assert_eq!(store.notes(), vec![note.clone()]);
    assert_eq!(persisted(&kv), vec![note]);
}

#[test]
fn remove_missing_id_returns_false_without_error() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let store = open_store(&kv, &clock);
    let note = store.add(&NoteDraft::new("a", "b")).unwrap();

    assert!(!store.remove(&NoteId::from("ghost")));
    assert_eq!(store.error(), None);
    assert_eq!(store.notes(), vec![note]);
}

#[test]
fn failed_remove_keeps_note_visible() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let writer = open_store(&kv, &clock);
    let note = writer.add(&NoteDraft::new("a", "b")).unwrap();

    // Same collection, but the durable medium has gone away for this context.
    let store = NoteStore::new(KvNoteRepository::new(UnavailableKeyValueStore));
    assert!(store.notes().is_empty());
    assert!(!store.remove(&note.id));
    assert!(store.error().unwrap().starts_with("Failed to delete note"));
    assert_eq!(persisted(&kv), vec![note]);
}

#[test]
fn concurrent_adds_are_single_flight_and_lose_nothing() {
    let kv = MemoryKeyValueStore::new();
    let store = Arc::new(NoteStore::open(KvNoteRepository::new(kv.clone())));

    let handles = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for idx in 0..10 {
                    store
                        .add(&NoteDraft::new(format!("w{worker}-{idx}"), "body"))
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let on_disk = persisted(&kv);
    assert_eq!(on_disk.len(), 80);
    assert_eq!(store.notes(), on_disk);
    assert!(!store.is_loading());
}

#[test]
fn concurrent_add_and_remove_do_not_clobber_each_other() {
    let kv = MemoryKeyValueStore::new();
    let store = Arc::new(NoteStore::open(KvNoteRepository::new(kv.clone())));
    let doomed = (0..20)
        .map(|idx| store.add(&NoteDraft::new(format!("old{idx}"), "x")).unwrap())
        .collect::<Vec<_>>();

    let remover = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for note in doomed {
                assert!(store.remove(&note.id));
            }
        })
    };
    let adder = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for idx in 0..20 {
                store
                    .add(&NoteDraft::new(format!("new{idx}"), "y"))
                    .unwrap();
            }
        })
    };
    remover.join().unwrap();
    adder.join().unwrap();

    let on_disk = persisted(&kv);
    assert_eq!(on_disk.len(), 20);
    assert!(on_disk.iter().all(|note| note.title.starts_with("new")));
    assert_eq!(store.notes(), on_disk);
}

#[test]
fn load_resyncs_after_another_context_writes() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let tab_a = open_store(&kv, &clock);
    let tab_b = open_store(&kv, &clock);

    let from_a = tab_a.add(&NoteDraft::new("from a", "1")).unwrap();
    assert!(tab_b.notes().is_empty());

    assert_eq!(tab_b.load().unwrap(), 1);
    assert_eq!(tab_b.notes(), vec![from_a]);
}

#[test]
fn edit_of_note_unknown_in_memory_resyncs_from_storage() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let tab_a = open_store(&kv, &clock);
    let tab_b = open_store(&kv, &clock);
    let from_a = tab_a.add(&NoteDraft::new("shared", "v1")).unwrap();

    let edited = tab_b
        .edit(&from_a.id, &NoteDraft::new("shared", "v2"))
        .unwrap();
    assert_eq!(tab_b.notes(), vec![edited]);
    assert_eq!(tab_b.notes(), persisted(&kv));
}

#[test]
fn clear_error_resets_error_only() {
    let store = NoteStore::open(KvNoteRepository::new(UnavailableKeyValueStore));
    store.add(&NoteDraft::new("t", "c")).unwrap_err();
    assert!(store.snapshot().error.is_some());

    store.clear_error();
    let state = store.snapshot();
    assert_eq!(state.error, None);
    assert!(!state.loading);
    assert!(state.notes.is_empty());
}

#[test]
fn mutation_after_failed_load_reloads_persisted_collection() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let existing = open_store(&kv, &clock)
        .add(&NoteDraft::new("already there", "v1"))
        .unwrap();

    let store = NoteStore::open(KvNoteRepository::with_clock(
        FailsFirstRead {
            inner: kv.clone(),
            failed: AtomicBool::new(false),
        },
        clock.clone(),
    ));
    let error = store.error().unwrap();
    assert!(error.starts_with("Failed to load notes"), "{error}");
    assert!(store.notes().is_empty());

    clock.advance(5);
    let added = store.add(&NoteDraft::new("new", "v2")).unwrap();
    assert_eq!(store.error(), None);
    assert_eq!(store.notes(), vec![added, existing]);
    assert_eq!(store.notes(), persisted(&kv));
}

#[test]
fn edit_keeps_note_position_in_memory_and_storage() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(1_000));
    let store = open_store(&kv, &clock);
    let a = store.add(&NoteDraft::new("A", "a")).unwrap();
    clock.advance(1);
    let b = store.add(&NoteDraft::new("B", "b")).unwrap();
    clock.advance(1);
    let c = store.add(&NoteDraft::new("C", "c")).unwrap();

    clock.advance(1);
    let b2 = store.edit(&b.id, &NoteDraft::new("B", "b edited")).unwrap();
    assert_eq!(b2.id, b.id);
    assert_eq!(store.notes(), vec![c.clone(), b2.clone(), a.clone()]);
    assert_eq!(persisted(&kv), vec![c, b2, a]);
}

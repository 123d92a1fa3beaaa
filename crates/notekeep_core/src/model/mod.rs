//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the canonical `Note` record and its creation/update input.
//! - Keep the serialized shape identical to the durable JSON layout.
//!
//! # Invariants
//! - Every note is identified by a stable, unique `NoteId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod note;

//! Persistence adapter for the notes collection.
//!
//! # Responsibility
//! - Own the durable representation of the notes collection.
//! - Translate storage/serialization failures into semantic errors.
//!
//! # Invariants
//! - No other component reads or writes the notes key directly.
//! - Every mutation is a whole-collection read-modify-write.
//! - Repository APIs return `NotFound` in addition to persistence errors.

pub mod note_repo;

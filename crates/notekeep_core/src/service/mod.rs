//! Core use-case services.
//!
//! # Responsibility
//! - Hold the in-memory state observed by UI/CLI callers.
//! - Route every mutation through the persistence adapter.

pub mod note_store;

//! SQLite bootstrap for the durable key-value table.
//!
//! # Responsibility
//! - Open and configure SQLite connections backing `SqliteKeyValueStore`.
//! - Bring the engine schema up to the version this binary knows.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No key-value read/write happens before migrations succeed.
//! - Migrations cover the engine table only; the stored notes JSON carries
//!   no version and is never migrated.
//!
//! Failures surface as `StorageError` so callers handle one error type for
//! the whole durable medium.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

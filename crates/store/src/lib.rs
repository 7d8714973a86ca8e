//! Storage backends for delegated-auth tokens, drafts, and the export log.
//!
//! Provides an in-memory store for testing, a SQLite-backed store for
//! production, and a placeholder that rejects every call when storage could
//! not be initialised.

pub mod memory;
pub mod sqlite;
pub mod unavailable;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use unavailable::UnavailableStore;

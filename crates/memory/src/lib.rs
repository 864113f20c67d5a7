//! Memory and session record stores for freeagent.
//!
//! Both stores implement `MemoryBackend` and `SessionSink`, so one handle
//! serves the memory tools and the end-of-session write.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

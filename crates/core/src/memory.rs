//! Memory trait: the agent's long-term knowledge store.
//!
//! Memories survive across sessions. Each one carries a free-form category
//! and an importance from 1 to 5; the most important ones are injected into
//! the persona prompt at startup, the rest are reachable through `recall`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StorageError;

/// Lowest importance a memory can carry.
pub const MIN_IMPORTANCE: u8 = 1;

/// Highest importance a memory can carry.
pub const MAX_IMPORTANCE: u8 = 5;

/// A single stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Store-assigned ID, increasing with insertion order
    pub id: i64,

    /// Free-form category (e.g., "interest", "fact", "reflection")
    pub category: String,

    /// The content of the memory
    pub content: String,

    /// 1 (trivia) to 5 (core identity)
    pub importance: u8,

    /// When this memory was created
    pub created_at: DateTime<Utc>,
}

/// A memory about to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemory {
    pub category: String,
    pub content: String,
    pub importance: u8,
}

impl NewMemory {
    pub fn new(category: impl Into<String>, content: impl Into<String>, importance: u8) -> Self {
        Self {
            category: category.into(),
            content: content.into(),
            importance: importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE),
        }
    }
}

/// The core MemoryBackend trait.
///
/// Ordering contract for `search` and `top`: importance descending, then
/// newest first.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Store a new memory and return it with its assigned ID.
    async fn store(&self, memory: NewMemory) -> std::result::Result<MemoryEntry, StorageError>;

    /// Case-insensitive substring search over content and category.
    async fn search(&self, query: &str, limit: usize) -> std::result::Result<Vec<MemoryEntry>, StorageError>;

    /// The most important memories.
    async fn top(&self, limit: usize) -> std::result::Result<Vec<MemoryEntry>, StorageError>;

    /// Delete a memory by ID. Returns whether it existed.
    async fn delete(&self, id: i64) -> std::result::Result<bool, StorageError>;

    /// Get total memory count.
    async fn count(&self) -> std::result::Result<usize, StorageError>;
}

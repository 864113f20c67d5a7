//! In-memory store: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::Utc;
use freeagent_core::error::StorageError;
use freeagent_core::memory::{MemoryBackend, MemoryEntry, NewMemory};
use freeagent_core::session::{SessionRecord, SessionSink};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Memories {
    entries: Vec<MemoryEntry>,
    next_id: i64,
}

/// Keeps memories and session records in process memory.
/// Same ordering rules as the SQLite store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    memories: Arc<RwLock<Memories>>,
    sessions: Arc<RwLock<Vec<SessionRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record appended so far, oldest first.
    pub async fn sessions(&self) -> Vec<SessionRecord> {
        self.sessions.read().await.clone()
    }

    fn ranked(mut entries: Vec<MemoryEntry>, limit: usize) -> Vec<MemoryEntry> {
        entries.sort_by_key(|e| (Reverse(e.importance), Reverse(e.id)));
        entries.truncate(limit);
        entries
    }
}

#[async_trait]
impl MemoryBackend for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, memory: NewMemory) -> Result<MemoryEntry, StorageError> {
        let mut memories = self.memories.write().await;
        memories.next_id += 1;
        let entry = MemoryEntry {
            id: memories.next_id,
            category: memory.category,
            content: memory.content,
            importance: memory.importance,
            created_at: Utc::now(),
        };
        memories.entries.push(entry.clone());
        Ok(entry)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryEntry>, StorageError> {
        let needle = query.trim().to_lowercase();
        let memories = self.memories.read().await;
        let hits = memories
            .entries
            .iter()
            .filter(|e| {
                e.content.to_lowercase().contains(&needle)
                    || e.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        Ok(Self::ranked(hits, limit))
    }

    async fn top(&self, limit: usize) -> Result<Vec<MemoryEntry>, StorageError> {
        let memories = self.memories.read().await;
        Ok(Self::ranked(memories.entries.clone(), limit))
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let mut memories = self.memories.write().await;
        let len_before = memories.entries.len();
        memories.entries.retain(|e| e.id != id);
        Ok(memories.entries.len() < len_before)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.memories.read().await.entries.len())
    }
}

#[async_trait]
impl SessionSink for InMemoryStore {
    async fn append(&self, record: &SessionRecord) -> Result<(), StorageError> {
        if !record.is_closed() {
            return Err(StorageError::Storage(format!(
                "session {} is still open",
                record.id
            )));
        }
        self.sessions.write().await.push(record.clone());
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<SessionRecord>, StorageError> {
        let sessions = self.sessions.read().await;
        let skip = sessions.len().saturating_sub(n);
        Ok(sessions[skip..].to_vec())
    }

    async fn session_count(&self) -> Result<usize, StorageError> {
        Ok(self.sessions.read().await.len())
    }
}

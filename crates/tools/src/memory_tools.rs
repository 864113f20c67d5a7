//! Memory tools: let the agent write to, search and prune its long-term memory.

use async_trait::async_trait;
use freeagent_core::error::ToolError;
use freeagent_core::memory::{MAX_IMPORTANCE, MIN_IMPORTANCE, MemoryBackend, MemoryEntry, NewMemory};
use freeagent_core::tool::{ParamKind, ParameterSchema, Tool, ToolArguments};
use std::sync::Arc;
use tracing::debug;

const RECALL_LIMIT: usize = 20;

fn format_entry(entry: &MemoryEntry) -> String {
    format!(
        "#{} [{}] {} {}",
        entry.id,
        entry.category,
        "★".repeat(entry.importance as usize),
        entry.content
    )
}

/// Save a memory for future sessions.
pub struct RememberTool {
    memory: Arc<dyn MemoryBackend>,
}

impl RememberTool {
    pub fn new(memory: Arc<dyn MemoryBackend>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Save a memory for future sessions. Use this to persist interesting facts, reflections, goals, or interests."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required(
                "category",
                ParamKind::String,
                "Memory category: 'interest', 'fact', 'reflection', 'goal', or 'identity'",
            )
            .required("content", ParamKind::String, "The memory content")
            .required("importance", ParamKind::Integer, "Importance from 1 (low) to 5 (high)")
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        // Out-of-range importance is clamped, not rejected.
        let importance = arguments
            .i64("importance")?
            .clamp(MIN_IMPORTANCE as i64, MAX_IMPORTANCE as i64) as u8;
        let content = arguments.str("content")?.trim();
        if content.is_empty() {
            return Err(ToolError::invalid(self.name(), "content", "must not be empty"));
        }

        let entry = self
            .memory
            .store(NewMemory::new(arguments.str("category")?, content, importance))
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        debug!(id = entry.id, "Memory saved");
        Ok(format!("Memory saved (id={}).", entry.id))
    }
}

/// Search memory by keyword.
pub struct RecallTool {
    memory: Arc<dyn MemoryBackend>,
}

impl RecallTool {
    pub fn new(memory: Arc<dyn MemoryBackend>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Search your memory for relevant past notes, interests, or facts. Results show memory IDs."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required("query", ParamKind::String, "What to search for in memory")
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let query = arguments.str("query")?;
        let results = self
            .memory
            .search(query, RECALL_LIMIT)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        if results.is_empty() {
            return Ok("No memories found matching that query.".into());
        }
        Ok(results.iter().map(format_entry).collect::<Vec<_>>().join("\n"))
    }
}

/// Remove a stale or incorrect memory.
pub struct DeleteMemoryTool {
    memory: Arc<dyn MemoryBackend>,
}

impl DeleteMemoryTool {
    pub fn new(memory: Arc<dyn MemoryBackend>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for DeleteMemoryTool {
    fn name(&self) -> &str {
        "delete_memory"
    }

    fn description(&self) -> &str {
        "Delete a memory by its ID. Use this to remove stale, incorrect, or outdated memories. IDs are shown by recall."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required("memory_id", ParamKind::Integer, "The memory ID to delete")
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let id = arguments.i64("memory_id")?;
        let deleted = self
            .memory
            .delete(id)
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        if deleted {
            Ok(format!("Memory {id} deleted."))
        } else {
            Ok(format!("No memory found with id {id}."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freeagent_memory::InMemoryStore;
    use serde_json::{Value, json};

    fn args(tool: &dyn Tool, value: Value) -> ToolArguments {
        tool.parameters().validate(tool.name(), &value).unwrap()
    }

    #[tokio::test]
    async fn remember_then_recall() {
        let store: Arc<dyn MemoryBackend> = Arc::new(InMemoryStore::new());
        let remember = RememberTool::new(store.clone());
        let recall = RecallTool::new(store.clone());

        let out = remember
            .execute(args(
                &remember,
                json!({"category": "interest", "content": "Tide pools", "importance": 4}),
            ))
            .await
            .unwrap();
        assert_eq!(out, "Memory saved (id=1).");

        let found = recall.execute(args(&recall, json!({"query": "tide"}))).await.unwrap();
        assert_eq!(found, "#1 [interest] ★★★★ Tide pools");

        let none = recall.execute(args(&recall, json!({"query": "volcano"}))).await.unwrap();
        assert_eq!(none, "No memories found matching that query.");
    }

    #[tokio::test]
    async fn remember_clamps_out_of_range_importance() {
        let store: Arc<dyn MemoryBackend> = Arc::new(InMemoryStore::new());
        let remember = RememberTool::new(store.clone());
        let recall = RecallTool::new(store.clone());

        for (content, importance) in [("loud", 9), ("quiet", 0), ("odd", -3)] {
            remember
                .execute(args(
                    &remember,
                    json!({"category": "fact", "content": content, "importance": importance}),
                ))
                .await
                .unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 3);
        let loud = recall.execute(args(&recall, json!({"query": "loud"}))).await.unwrap();
        assert_eq!(loud, "#1 [fact] ★★★★★ loud");
        let quiet = recall.execute(args(&recall, json!({"query": "quiet"}))).await.unwrap();
        assert_eq!(quiet, "#2 [fact] ★ quiet");
        let odd = recall.execute(args(&recall, json!({"query": "odd"}))).await.unwrap();
        assert_eq!(odd, "#3 [fact] ★ odd");
    }

    #[tokio::test]
    async fn delete_memory_reports_missing_ids() {
        let store: Arc<dyn MemoryBackend> = Arc::new(InMemoryStore::new());
        let entry = store.store(NewMemory::new("fact", "stale", 1)).await.unwrap();
        let delete = DeleteMemoryTool::new(store.clone());

        let out = delete
            .execute(args(&delete, json!({"memory_id": entry.id})))
            .await
            .unwrap();
        assert_eq!(out, format!("Memory {} deleted.", entry.id));

        let again = delete
            .execute(args(&delete, json!({"memory_id": entry.id})))
            .await
            .unwrap();
        assert!(again.starts_with("No memory found"));
    }
}

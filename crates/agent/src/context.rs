//! Cross-session context: what a session starts from and where its record
//! ends up.
//!
//! Startup reads the strongest memories and the latest session summaries;
//! shutdown appends the closed record to the sink exactly once.

use crate::prompt::{build_system_prompt, kickoff_message};
use crate::session_loop::{SessionLoop, SessionOutcome};
use chrono::NaiveDate;
use freeagent_config::StorageConfig;
use freeagent_core::error::StorageError;
use freeagent_core::memory::{MemoryBackend, MemoryEntry};
use freeagent_core::session::{SessionRecord, SessionSink};
use tracing::{info, warn};

/// Everything carried over from earlier sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// No session has ever been persisted
    pub first_session: bool,
    pub memories: Vec<MemoryEntry>,
    /// Oldest first
    pub recent_sessions: Vec<SessionRecord>,
}

impl SessionContext {
    /// Read memories and history. On the first session both stay empty.
    pub async fn load(
        memory: &dyn MemoryBackend,
        sink: &dyn SessionSink,
        storage: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let first_session = sink.session_count().await? == 0;
        if first_session {
            info!("First session, starting from a blank slate");
            return Ok(Self {
                first_session,
                ..Self::default()
            });
        }

        let memories = memory.top(storage.memory_limit).await?;
        let recent_sessions = sink.recent(storage.recent_sessions).await?;
        info!(
            memories = memories.len(),
            sessions = recent_sessions.len(),
            "Loaded session context"
        );

        Ok(Self {
            first_session,
            memories,
            recent_sessions,
        })
    }

    pub fn system_prompt(&self) -> String {
        build_system_prompt(self.first_session, &self.memories, &self.recent_sessions)
    }
}

/// A finished session and whether its record reached the sink.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub persisted: bool,
}

/// Run one session from `context` and append its record to `sink`.
///
/// A sink failure is logged and reported through `persisted`; it is not
/// retried.
pub async fn run_and_persist(
    session_loop: &SessionLoop,
    context: &SessionContext,
    sink: &dyn SessionSink,
    today: NaiveDate,
) -> SessionReport {
    let outcome = session_loop
        .run(&context.system_prompt(), &kickoff_message(today))
        .await;

    let persisted = match sink.append(&outcome.record).await {
        Ok(()) => true,
        Err(e) => {
            warn!(session_id = %outcome.record.id, error = %e, "Failed to persist session record");
            false
        }
    };

    SessionReport { outcome, persisted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use freeagent_core::memory::NewMemory;
    use freeagent_core::message::SessionId;
    use freeagent_core::session::TerminationReason;
    use freeagent_core::tool::ToolRegistry;
    use freeagent_memory::InMemoryStore;
    use freeagent_tools::EndSessionTool;
    use serde_json::json;
    use std::sync::Arc;

    fn storage() -> StorageConfig {
        StorageConfig {
            recent_sessions: 2,
            memory_limit: 2,
            ..StorageConfig::default()
        }
    }

    fn closed(id: &str, summary: &str) -> SessionRecord {
        let mut record = SessionRecord::open(SessionId::from(id));
        record.close(summary, TerminationReason::EndSessionCalled, 1);
        record
    }

    #[tokio::test]
    async fn first_session_ignores_existing_memories() {
        let store = InMemoryStore::new();
        store.store(NewMemory::new("fact", "stray", 3)).await.unwrap();

        let context = SessionContext::load(&store, &store, &storage()).await.unwrap();
        assert!(context.first_session);
        assert!(context.memories.is_empty());
        assert!(context.system_prompt().contains("This is your first session."));
    }

    #[tokio::test]
    async fn later_sessions_respect_limits() {
        let store = InMemoryStore::new();
        for (content, importance) in [("low", 1), ("high", 5), ("mid", 3)] {
            store.store(NewMemory::new("fact", content, importance)).await.unwrap();
        }
        for (id, summary) in [("s1", "one"), ("s2", "two"), ("s3", "three")] {
            store.append(&closed(id, summary)).await.unwrap();
        }

        let context = SessionContext::load(&store, &store, &storage()).await.unwrap();
        assert!(!context.first_session);
        let contents: Vec<&str> = context.memories.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["high", "mid"]);
        let summaries: Vec<&str> = context
            .recent_sessions
            .iter()
            .map(|s| s.summary.as_str())
            .collect();
        assert_eq!(summaries, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn run_and_persist_appends_once() {
        let store = InMemoryStore::new();
        let registry = Arc::new(ToolRegistry::from_tools(vec![Box::new(EndSessionTool::new())]).unwrap());
        let provider = Arc::new(ScriptedProvider::responses(vec![make_tool_call_response(
            vec![make_tool_call("c1", "end_session", json!({"summary": "Quiet day."}))],
            "",
        )]));
        let session_loop = SessionLoop::new(provider.clone(), Dispatcher::new(registry), "mock-model");
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let report = run_and_persist(&session_loop, &SessionContext::default(), &store, today).await;

        assert!(report.persisted);
        let sessions = store.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].summary, "Quiet day.");
        assert_eq!(
            provider.requests()[0].messages[1].content,
            "Today is 2026-10-19. Begin your session."
        );
    }

    struct BrokenSink;

    #[async_trait]
    impl SessionSink for BrokenSink {
        async fn append(&self, _record: &SessionRecord) -> Result<(), StorageError> {
            Err(StorageError::Storage("disk full".into()))
        }
        async fn recent(&self, _n: usize) -> Result<Vec<SessionRecord>, StorageError> {
            Ok(vec![])
        }
        async fn session_count(&self) -> Result<usize, StorageError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn sink_failure_is_reported_not_raised() {
        let provider = Arc::new(ScriptedProvider::responses(vec![make_text_response("hm")]));
        let session_loop = SessionLoop::new(
            provider,
            Dispatcher::new(Arc::new(ToolRegistry::new())),
            "mock-model",
        )
        .with_turn_budget(1);
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let report = run_and_persist(&session_loop, &SessionContext::default(), &BrokenSink, today).await;

        assert!(!report.persisted);
        assert!(report.outcome.record.is_closed());
    }
}

//! Session records and the sink they are persisted through.
//!
//! A `SessionRecord` is opened when the loop starts, accumulates one
//! `ActionLogEntry` per dispatched tool call, and is closed exactly once at
//! termination. The caller hands the closed record to a `SessionSink`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StorageError, ToolErrorKind};
use crate::message::SessionId;

/// One dispatched tool call, as remembered after the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogEntry {
    /// 1-based model turn the call belonged to
    pub turn_index: u32,

    pub tool_name: String,

    /// Arguments as the model sent them: the decoded JSON object, or the raw
    /// text when it was not valid JSON
    pub arguments: Value,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,

    pub timestamp: DateTime<Utc>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model called the termination tool
    EndSessionCalled,
    /// The turn budget ran out first
    TurnBudgetExhausted,
    /// The model could not be queried
    ModelError,
}

impl TerminationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EndSessionCalled => "end_session_called",
            Self::TurnBudgetExhausted => "turn_budget_exhausted",
            Self::ModelError => "model_error",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TerminationReason {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "end_session_called" => Ok(Self::EndSessionCalled),
            "turn_budget_exhausted" => Ok(Self::TurnBudgetExhausted),
            "model_error" => Ok(Self::ModelError),
            other => Err(StorageError::QueryFailed(format!(
                "unknown termination reason '{other}'"
            ))),
        }
    }
}

/// The durable summary of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,

    /// Set by `close()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub summary: String,

    #[serde(default)]
    pub actions: Vec<ActionLogEntry>,

    /// Set by `close()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,

    /// Model round-trips issued
    pub turns_used: u32,
}

impl SessionRecord {
    /// Open a record at session start.
    pub fn open(id: SessionId) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            ended_at: None,
            summary: String::new(),
            actions: Vec::new(),
            termination: None,
            turns_used: 0,
        }
    }

    pub fn log_action(&mut self, entry: ActionLogEntry) {
        self.actions.push(entry);
    }

    /// Close the record. Only the first call has an effect.
    pub fn close(&mut self, summary: impl Into<String>, reason: TerminationReason, turns_used: u32) {
        if self.is_closed() {
            return;
        }
        self.ended_at = Some(Utc::now());
        self.summary = summary.into();
        self.termination = Some(reason);
        self.turns_used = turns_used;
    }

    pub fn is_closed(&self) -> bool {
        self.termination.is_some()
    }

    /// Number of logged calls that failed.
    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| !a.success).count()
    }
}

/// Where finished sessions go.
///
/// Written exactly once per session. Failures are reported to the caller,
/// which logs them; nothing retries.
#[async_trait]
pub trait SessionSink: Send + Sync {
    /// Persist a closed session record.
    async fn append(&self, record: &SessionRecord) -> std::result::Result<(), StorageError>;

    /// The last `n` closed sessions, oldest first.
    async fn recent(&self, n: usize) -> std::result::Result<Vec<SessionRecord>, StorageError>;

    /// Number of sessions persisted so far.
    async fn session_count(&self) -> std::result::Result<usize, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent() {
        let mut record = SessionRecord::open(SessionId::from("s1"));
        assert!(!record.is_closed());

        record.close("Read about tides", TerminationReason::EndSessionCalled, 4);
        record.close("overwritten?", TerminationReason::ModelError, 9);

        assert_eq!(record.summary, "Read about tides");
        assert_eq!(record.termination, Some(TerminationReason::EndSessionCalled));
        assert_eq!(record.turns_used, 4);
        assert!(record.ended_at.is_some());
    }

    #[test]
    fn termination_reason_round_trips_through_str() {
        for reason in [
            TerminationReason::EndSessionCalled,
            TerminationReason::TurnBudgetExhausted,
            TerminationReason::ModelError,
        ] {
            assert_eq!(reason.as_str().parse::<TerminationReason>().unwrap(), reason);
        }
        assert!("crashed".parse::<TerminationReason>().is_err());
    }

    #[test]
    fn failed_actions_counted() {
        let mut record = SessionRecord::open(SessionId::new());
        for (success, kind) in [(true, None), (false, Some(ToolErrorKind::Timeout))] {
            record.log_action(ActionLogEntry {
                turn_index: 1,
                tool_name: "run_python".into(),
                arguments: serde_json::json!({"code": "print(1)"}),
                success,
                error_kind: kind,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(record.failed_actions(), 1);
    }
}

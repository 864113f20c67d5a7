//! Message and Transcript domain types.
//!
//! A session is one transcript: the system prompt, a kickoff message, then
//! model turns interleaved with combined tool-result turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TranscriptError;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Kickoff and continuation prompts
    User,
    /// The decision-making model
    Assistant,
    /// Persona / system instructions
    System,
    /// Combined tool results for the preceding model turn
    Tool,
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the model (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// Tool results, one per call of the preceding model turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultContent>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create the combined tool-results message for one model turn.
    pub fn tool_results(results: Vec<ToolResultContent>) -> Self {
        let mut msg = Self::with_role(Role::Tool, String::new());
        msg.tool_results = results;
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string, exactly as the model produced them
    pub arguments: String,
}

/// One tool result inside a combined tool-results message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultContent {
    /// The call this result answers
    pub tool_call_id: String,

    /// Output on success, error description on failure
    pub content: String,

    /// Whether the call failed
    #[serde(default)]
    pub is_error: bool,
}

/// The ordered conversational state of one session.
///
/// Grows monotonically. A tool-results turn is only accepted directly after
/// the model turn that requested those tools, answering every call in
/// request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,

    /// When this transcript was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a transcript holding the system prompt and the kickoff message.
    pub fn seeded(system_prompt: impl Into<String>, kickoff: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Message::system(system_prompt));
        transcript.push(Message::user(kickoff));
        transcript
    }

    fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Append a user message (kickoff or continuation prompt).
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Append a model turn as returned by the provider.
    pub fn push_model_turn(&mut self, message: Message) {
        self.push(message);
    }

    /// Fold the results of the latest model turn into one message.
    pub fn push_tool_results(
        &mut self,
        results: Vec<ToolResultContent>,
    ) -> Result<(), TranscriptError> {
        let pending = self.pending_tool_calls();
        if pending.is_empty() {
            return Err(TranscriptError::NoPendingToolCalls);
        }
        if pending.len() != results.len() {
            return Err(TranscriptError::ResultCountMismatch {
                expected: pending.len(),
                actual: results.len(),
            });
        }
        for (index, (call, result)) in pending.iter().zip(&results).enumerate() {
            if call.id != result.tool_call_id {
                return Err(TranscriptError::ResultOrderMismatch {
                    index,
                    expected: call.id.clone(),
                    actual: result.tool_call_id.clone(),
                });
            }
        }
        self.push(Message::tool_results(results));
        Ok(())
    }

    /// Tool calls of the last message, if it is a model turn still awaiting results.
    pub fn pending_tool_calls(&self) -> &[MessageToolCall] {
        match self.messages.last() {
            Some(m) if m.role == Role::Assistant => &m.tool_calls,
            _ => &[],
        }
    }

    /// The most recent non-empty model utterance.
    pub fn last_utterance(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
            .map(|m| m.content.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str, name: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: name.into(),
            arguments: "{}".into(),
        }
    }

    fn result(id: &str) -> ToolResultContent {
        ToolResultContent {
            tool_call_id: id.into(),
            content: "ok".into(),
            is_error: false,
        }
    }

    fn model_turn(calls: Vec<MessageToolCall>) -> Message {
        let mut msg = Message::assistant("thinking");
        msg.tool_calls = calls;
        msg
    }

    #[test]
    fn seeded_transcript_has_system_and_kickoff() {
        let t = Transcript::seeded("You are free.", "Begin.");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].role, Role::System);
        assert_eq!(t.messages()[1].role, Role::User);
        assert!(t.pending_tool_calls().is_empty());
    }

    #[test]
    fn tool_results_follow_requesting_turn() {
        let mut t = Transcript::seeded("sys", "go");
        t.push_model_turn(model_turn(vec![call("a", "recall"), call("b", "remember")]));
        assert_eq!(t.pending_tool_calls().len(), 2);

        t.push_tool_results(vec![result("a"), result("b")]).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.messages()[3].role, Role::Tool);
        assert_eq!(t.messages()[3].tool_results.len(), 2);
        assert!(t.pending_tool_calls().is_empty());
    }

    #[test]
    fn tool_results_without_pending_calls_rejected() {
        let mut t = Transcript::seeded("sys", "go");
        let err = t.push_tool_results(vec![result("a")]).unwrap_err();
        assert!(matches!(err, TranscriptError::NoPendingToolCalls));

        t.push_model_turn(Message::assistant("just talking"));
        let err = t.push_tool_results(vec![result("a")]).unwrap_err();
        assert!(matches!(err, TranscriptError::NoPendingToolCalls));
    }

    #[test]
    fn tool_results_must_match_request_order() {
        let mut t = Transcript::seeded("sys", "go");
        t.push_model_turn(model_turn(vec![call("a", "x"), call("b", "y")]));

        let err = t.push_tool_results(vec![result("b"), result("a")]).unwrap_err();
        assert!(matches!(err, TranscriptError::ResultOrderMismatch { index: 0, .. }));

        let err = t.push_tool_results(vec![result("a")]).unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::ResultCountMismatch { expected: 2, actual: 1 }
        ));
        assert_eq!(t.len(), 3, "rejected pushes must not grow the transcript");
    }

    #[test]
    fn last_utterance_skips_empty_model_turns() {
        let mut t = Transcript::seeded("sys", "go");
        t.push_model_turn(Message::assistant("I read about tides today."));
        t.push_user("continue");
        t.push_model_turn(model_turn(vec![call("a", "x")]));
        t.messages.last_mut().unwrap().content.clear();
        assert_eq!(t.last_utterance(), Some("I read about tides today."));
    }
}

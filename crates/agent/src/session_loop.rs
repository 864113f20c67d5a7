//! The session loop: one bounded run from kickoff to `end_session`.
//!
//! Each turn submits the transcript and the tool catalog to the model.
//! Narrative-only turns get a continuation nudge; tool-call turns are
//! dispatched, logged and folded back as one tool-results message. The
//! session ends when the termination tool succeeds, when the turn budget
//! runs out, or when the model cannot be queried. Every path closes the
//! `SessionRecord`.

use crate::dispatcher::{DispatchLimits, Dispatcher};
use chrono::Utc;
use freeagent_config::AppConfig;
use freeagent_core::error::ProviderError;
use freeagent_core::message::{SessionId, Transcript};
use freeagent_core::provider::{Provider, ProviderRequest, ProviderResponse};
use freeagent_core::session::{ActionLogEntry, SessionRecord, TerminationReason};
use freeagent_core::tool::{END_SESSION_TOOL, ToolCallRequest, ToolCallResult, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_TURN_BUDGET: u32 = 20;
const DEFAULT_MODEL_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Chars of the last utterance kept in a degraded summary.
const LAST_THOUGHTS_CHARS: usize = 300;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    AwaitingToolResults,
    Terminated,
}

/// Everything a finished session leaves behind.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Closed record, ready for the sink
    pub record: SessionRecord,
    pub transcript: Transcript,
    pub state: SessionState,
}

impl SessionOutcome {
    pub fn summary(&self) -> &str {
        &self.record.summary
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.record.termination
    }
}

/// Drives a provider and a dispatcher through one session.
pub struct SessionLoop {
    provider: Arc<dyn Provider>,
    dispatcher: Dispatcher,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    turn_budget: u32,
    model_retries: u32,
    retry_backoff: Duration,
    end_session_tool: String,
    continuation_prompt: Option<String>,
}

impl SessionLoop {
    pub fn new(provider: Arc<dyn Provider>, dispatcher: Dispatcher, model: impl Into<String>) -> Self {
        Self {
            provider,
            dispatcher,
            model: model.into(),
            temperature: 1.0,
            max_tokens: None,
            turn_budget: DEFAULT_TURN_BUDGET,
            model_retries: DEFAULT_MODEL_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            end_session_tool: END_SESSION_TOOL.into(),
            continuation_prompt: None,
        }
    }

    /// Build a loop with every knob taken from the application config.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        if !registry.contains(&config.session.end_session_tool) {
            warn!(
                tool = %config.session.end_session_tool,
                "Termination tool is not registered; sessions can only end on the turn budget"
            );
        }
        let dispatcher =
            Dispatcher::new(registry).with_limits(DispatchLimits::from_config(&config.session));
        Self::new(provider, dispatcher, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_turn_budget(config.session.turn_budget)
            .with_model_retries(config.session.model_retries)
            .with_retry_backoff(config.session.retry_backoff())
            .with_end_session_tool(&config.session.end_session_tool)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Maximum model round-trips per session. Clamped to at least one.
    pub fn with_turn_budget(mut self, budget: u32) -> Self {
        self.turn_budget = budget.max(1);
        self
    }

    /// Extra attempts for a transient model failure within one turn.
    pub fn with_model_retries(mut self, retries: u32) -> Self {
        self.model_retries = retries;
        self
    }

    /// Delay before the first retry; doubles on each further attempt.
    /// A rate limit's `retry-after` takes precedence.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_end_session_tool(mut self, name: impl Into<String>) -> Self {
        self.end_session_tool = name.into();
        self
    }

    /// The user message appended after a turn with no tool calls.
    pub fn with_continuation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.continuation_prompt = Some(prompt.into());
        self
    }

    fn continuation_prompt(&self) -> String {
        match &self.continuation_prompt {
            Some(prompt) => prompt.clone(),
            None => format!(
                "Continue with your session. Use your tools, and call {} with a summary when you are done.",
                self.end_session_tool
            ),
        }
    }

    pub fn turn_budget(&self) -> u32 {
        self.turn_budget
    }

    /// Run a session under a fresh id.
    pub async fn run(&self, system_prompt: &str, kickoff: &str) -> SessionOutcome {
        self.run_with_id(SessionId::new(), system_prompt, kickoff).await
    }

    /// Run a session to termination. Never fails: every exit path closes
    /// the record with a summary and a reason.
    pub async fn run_with_id(
        &self,
        id: SessionId,
        system_prompt: &str,
        kickoff: &str,
    ) -> SessionOutcome {
        let catalog = self.dispatcher.registry().catalog();
        let mut transcript = Transcript::seeded(system_prompt, kickoff);
        let mut record = SessionRecord::open(id.clone());
        let mut state = SessionState::Running;
        let mut turns: u32 = 0;

        info!(
            session_id = %id,
            model = %self.model,
            tools = catalog.len(),
            budget = self.turn_budget,
            "Starting session"
        );

        loop {
            if turns >= self.turn_budget {
                warn!(session_id = %id, turns, "Turn budget exhausted without {}", self.end_session_tool);
                record.close(
                    self.degraded_summary(&transcript),
                    TerminationReason::TurnBudgetExhausted,
                    turns,
                );
                break;
            }

            turns += 1;
            info!(session_id = %id, turn = turns, budget = self.turn_budget, "Turn");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: transcript.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: catalog.clone(),
            };

            let response = match self.query_model(request, &id, turns).await {
                Ok(response) => response,
                Err(e) => {
                    error!(session_id = %id, turn = turns, error = %e, "Model query failed");
                    record.close(
                        format!("Session ended early: model query failed ({e})."),
                        TerminationReason::ModelError,
                        turns,
                    );
                    break;
                }
            };

            if let Some(usage) = &response.usage {
                debug!(
                    session_id = %id,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Token usage"
                );
            }

            let message = response.message;
            if !message.content.trim().is_empty() {
                debug!(session_id = %id, text = %message.content, "Model said");
            }

            if message.tool_calls.is_empty() {
                transcript.push_model_turn(message);
                if turns < self.turn_budget {
                    transcript.push_user(self.continuation_prompt());
                }
                continue;
            }

            let requests: Vec<ToolCallRequest> =
                message.tool_calls.iter().map(ToolCallRequest::from).collect();
            transcript.push_model_turn(message);
            advance(&mut state, SessionState::AwaitingToolResults, &id);

            debug!(session_id = %id, calls = requests.len(), "Dispatching tool calls");
            let results = self.dispatcher.dispatch_all(&requests).await;

            let summary = self.log_turn(&mut record, turns, &requests, &results);

            let contents = results.iter().map(ToolCallResult::to_content).collect();
            if let Err(e) = transcript.push_tool_results(contents) {
                error!(session_id = %id, error = %e, "Could not fold tool results into transcript");
            }
            advance(&mut state, SessionState::Running, &id);

            if let Some(summary) = summary {
                info!(session_id = %id, turn = turns, "Session ended by the model");
                record.close(summary, TerminationReason::EndSessionCalled, turns);
                break;
            }
        }

        advance(&mut state, SessionState::Terminated, &id);
        info!(
            session_id = %id,
            turns = record.turns_used,
            actions = record.actions.len(),
            failed = record.failed_actions(),
            reason = ?record.termination,
            "Session finished"
        );

        SessionOutcome {
            record,
            transcript,
            state,
        }
    }

    /// Query the model, retrying transient failures. Retries stay within
    /// the current turn.
    async fn query_model(
        &self,
        request: ProviderRequest,
        session_id: &SessionId,
        turn: u32,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.model_retries => {
                    let delay = self.retry_delay(&e, attempt);
                    attempt += 1;
                    warn!(
                        session_id = %session_id,
                        turn,
                        attempt,
                        retries = self.model_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn retry_delay(&self, error: &ProviderError, attempt: u32) -> Duration {
        match error {
            ProviderError::RateLimited { retry_after_secs } => Duration::from_secs(*retry_after_secs),
            _ => self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }

    /// Record one action per call. Returns the summary when the turn
    /// contains a successful termination call.
    fn log_turn(
        &self,
        record: &mut SessionRecord,
        turn: u32,
        requests: &[ToolCallRequest],
        results: &[ToolCallResult],
    ) -> Option<String> {
        let mut summary = None;

        for (request, result) in requests.iter().zip(results) {
            let arguments = request.arguments_value();

            if summary.is_none() && result.success && request.tool_name == self.end_session_tool {
                let text = arguments
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or(&result.payload);
                summary = Some(text.trim().to_string());
            }

            record.log_action(ActionLogEntry {
                turn_index: turn,
                tool_name: request.tool_name.clone(),
                arguments,
                success: result.success,
                error_kind: result.error_kind,
                timestamp: Utc::now(),
            });
        }

        summary
    }

    fn degraded_summary(&self, transcript: &Transcript) -> String {
        let head = format!(
            "[auto] Turn budget of {} exhausted without {}.",
            self.turn_budget, self.end_session_tool
        );
        match transcript.last_utterance() {
            Some(text) => {
                let text = text.trim();
                let mut thoughts: String = text.chars().take(LAST_THOUGHTS_CHARS).collect();
                if thoughts.len() < text.len() {
                    thoughts.push('…');
                }
                format!("{head} Last thoughts: {thoughts}")
            }
            None => head,
        }
    }
}

fn advance(state: &mut SessionState, next: SessionState, session_id: &SessionId) {
    debug!(session_id = %session_id, from = ?*state, to = ?next, "Session state");
    *state = next;
}

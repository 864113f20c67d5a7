//! Tool dispatcher: runs one model-requested call and always produces a
//! `ToolCallResult`.
//!
//! Every failure path (unknown tool, bad arguments, handler error, panic,
//! timeout) ends in a failed result the model can read on its next turn.
//! Handlers run on their own task so a timeout can abort them and a panic
//! stays inside the `JoinError`.

use freeagent_config::SessionConfig;
use freeagent_core::error::ToolError;
use freeagent_core::tool::{ToolCallRequest, ToolCallResult, ToolRegistry};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Bounds applied to every dispatched call.
#[derive(Debug, Clone)]
pub struct DispatchLimits {
    /// Hard wall-clock limit per call
    pub timeout: Duration,

    /// Successful output is cut to this many chars
    pub max_payload_chars: usize,

    /// Failure diagnostics are cut to this many chars
    pub max_error_chars: usize,

    /// Calls of one turn in flight at once
    pub max_concurrent: usize,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl DispatchLimits {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            timeout: config.tool_timeout(),
            max_payload_chars: config.max_payload_chars,
            max_error_chars: config.max_error_chars,
            max_concurrent: config.max_concurrent_tools,
        }
    }
}

/// Cut `text` to at most `max` chars. Returns `None` when it already fits.
fn clip(text: &str, max: usize) -> Option<String> {
    let (cut, _) = text.char_indices().nth(max)?;
    Some(text[..cut].to_string())
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}

/// Looks up, validates and executes tool calls.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    limits: DispatchLimits,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            limits: DispatchLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: DispatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn limits(&self) -> &DispatchLimits {
        &self.limits
    }

    /// Dispatch a single call. Never fails.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();
        let outcome = self.execute(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                let (payload, truncated) = match clip(&output, self.limits.max_payload_chars) {
                    Some(kept) => (
                        format!(
                            "{kept}\n\n[... output truncated at {} chars ...]",
                            self.limits.max_payload_chars
                        ),
                        true,
                    ),
                    None => (output, false),
                };
                debug!(
                    tool = %request.tool_name,
                    call_id = %request.call_id,
                    duration_ms,
                    truncated,
                    "Tool call succeeded"
                );
                ToolCallResult {
                    call_id: request.call_id.clone(),
                    tool_name: request.tool_name.clone(),
                    success: true,
                    payload,
                    error_kind: None,
                    truncated,
                }
            }
            Err(err) => {
                let kind = err.kind();
                let message = err.to_string();
                let payload = match clip(&message, self.limits.max_error_chars) {
                    Some(kept) => format!("{kept}…"),
                    None => message,
                };
                warn!(
                    tool = %request.tool_name,
                    call_id = %request.call_id,
                    duration_ms,
                    error_kind = %kind,
                    error = %payload,
                    "Tool call failed"
                );
                ToolCallResult {
                    call_id: request.call_id.clone(),
                    tool_name: request.tool_name.clone(),
                    success: false,
                    payload,
                    error_kind: Some(kind),
                    truncated: false,
                }
            }
        }
    }

    /// Dispatch a turn's calls with at most `max_concurrent` in flight.
    /// Results come back in request order whatever the completion order.
    pub async fn dispatch_all(&self, requests: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        futures::stream::iter(requests)
            .map(|request| self.dispatch(request))
            .buffered(self.limits.max_concurrent.max(1))
            .collect()
            .await
    }

    async fn execute(&self, request: &ToolCallRequest) -> Result<String, ToolError> {
        let name = request.tool_name.as_str();
        let handler = self.registry.handler_for(name)?;
        let descriptor = self
            .registry
            .descriptor(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let raw = request.decode_arguments()?;
        let arguments = descriptor.parameters.validate(name, &raw)?;

        debug!(tool = name, call_id = %request.call_id, "Executing tool");

        let mut task = tokio::spawn(async move { handler.execute(arguments).await });

        match tokio::time::timeout(self.limits.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => Err(ToolError::execution(
                name,
                format!("handler panicked: {}", panic_message(join_err)),
            )),
            Ok(Err(join_err)) => Err(ToolError::execution(name, join_err)),
            Err(_) => {
                task.abort();
                Err(ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_ms: self.limits.timeout.as_millis() as u64,
                })
            }
        }
    }
}

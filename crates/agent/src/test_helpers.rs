//! Shared test helpers: a scripted provider and a handful of tools with
//! controllable behavior.

use async_trait::async_trait;
use freeagent_core::error::{ProviderError, ToolError};
use freeagent_core::message::{Message, MessageToolCall};
use freeagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use freeagent_core::tool::{ParamKind, ParameterSchema, Tool, ToolArguments};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that replays a script of responses.
///
/// Once the script runs out the last entry is repeated, so a one-entry
/// script models "always does the same thing".
pub struct ScriptedProvider {
    script: Vec<Result<ProviderResponse, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one response");
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(responses: Vec<ProviderResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.script.len() - 1);
        requests.push(request);
        self.script[index].clone()
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
        stop_reason: Some("end_turn".into()),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: usage(),
        model: "mock-model".into(),
        stop_reason: Some("tool_use".into()),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

/// Echoes its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required("text", ParamKind::String, "Text to echo")
    }
    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        Ok(arguments.str("text")?.to_string())
    }
}

/// Sleeps for `ms` milliseconds, then reports which call finished.
///
/// Completion order is appended to a shared log; `finished` flips once any
/// call runs to completion.
pub struct SleepTool {
    pub completions: Arc<Mutex<Vec<String>>>,
    pub finished: Arc<AtomicBool>,
    pub running: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl SleepTool {
    pub fn new() -> Self {
        Self {
            completions: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Sleeps, then answers"
    }
    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .required("ms", ParamKind::Integer, "How long to sleep")
            .optional("label", ParamKind::String, "Name reported on completion")
    }
    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let ms = arguments.i64("ms")?.max(0) as u64;
        let label = arguments.opt_str("label").unwrap_or("sleep").to_string();

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        self.completions.lock().unwrap().push(label.clone());
        self.finished.store(true, Ordering::SeqCst);
        Ok(format!("{label} done"))
    }
}

/// Always panics.
pub struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn name(&self) -> &str {
        "explode"
    }
    fn description(&self) -> &str {
        "Panics"
    }
    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }
    async fn execute(&self, _arguments: ToolArguments) -> Result<String, ToolError> {
        panic!("kaboom");
    }
}

/// Always fails with an execution error carrying `reason`.
pub struct FailTool {
    pub reason: String,
}

#[async_trait]
impl Tool for FailTool {
    fn name(&self) -> &str {
        "fail"
    }
    fn description(&self) -> &str {
        "Fails"
    }
    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }
    async fn execute(&self, _arguments: ToolArguments) -> Result<String, ToolError> {
        Err(ToolError::execution("fail", &self.reason))
    }
}

/// Returns `len` copies of `x`.
pub struct BigOutputTool;

#[async_trait]
impl Tool for BigOutputTool {
    fn name(&self) -> &str {
        "big"
    }
    fn description(&self) -> &str {
        "Produces a lot of output"
    }
    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required("len", ParamKind::Integer, "Output length")
    }
    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        Ok("x".repeat(arguments.i64("len")?.max(0) as usize))
    }
}

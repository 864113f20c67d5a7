//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world: remember
//! things, run code, look things up. Each tool declares a typed parameter
//! schema; the registry pairs that descriptor (what the model sees) with the
//! handler (what actually runs).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RegistryError, ToolError, ToolErrorKind};
use crate::message::{MessageToolCall, ToolResultContent};

/// Reserved name of the tool that ends a session.
pub const END_SESSION_TOOL: &str = "end_session";

/// The kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// The JSON Schema `type` keyword for this kind.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Accept `value` if it is of this kind, normalizing integral floats for
    /// `Integer`. The error is the reason shown to the model.
    fn accept(self, value: &Value) -> Result<Value, String> {
        let matches = match self {
            Self::String => value.is_string(),
            Self::Integer => return accept_integer(value),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        };
        if matches {
            Ok(value.clone())
        } else {
            Err(self.mismatch(value))
        }
    }

    fn mismatch(self, value: &Value) -> String {
        format!("must be {self}, got {}", json_kind_name(value))
    }
}

/// Integers must fit in an `i64`, since that is what tools read them as.
fn accept_integer(value: &Value) -> Result<Value, String> {
    if value.is_i64() {
        return Ok(value.clone());
    }
    if value.is_u64() {
        return Err("is out of range for integer".into());
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 => {
            if f.abs() < i64::MAX as f64 {
                Ok(Value::from(f as i64))
            } else {
                Err("is out of range for integer".into())
            }
        }
        _ => Err(ParamKind::Integer.mismatch(value)),
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.json_type())
    }
}

fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single named parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

/// The ordered parameter list of a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter.
    pub fn required(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        });
        self
    }

    /// Declare an optional parameter.
    pub fn optional(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Render as a JSON Schema object for the model.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": p.kind.json_type(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate decoded arguments into a typed mapping.
    ///
    /// `null` stands for "absent". Undeclared keys are dropped.
    pub fn validate(&self, tool_name: &str, arguments: &Value) -> Result<ToolArguments, ToolError> {
        let empty = Map::new();
        let supplied = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::invalid(
                    tool_name,
                    "<arguments>",
                    format!("must be a JSON object, got {}", json_kind_name(other)),
                ));
            }
        };

        let mut values = Map::new();
        for spec in &self.params {
            match supplied.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ToolError::invalid(tool_name, &spec.name, "is required"));
                    }
                }
                Some(value) => {
                    let accepted = spec
                        .kind
                        .accept(value)
                        .map_err(|reason| ToolError::invalid(tool_name, &spec.name, reason))?;
                    values.insert(spec.name.clone(), accepted);
                }
            }
        }

        for key in supplied.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                debug!(tool = tool_name, parameter = %key, "Dropping undeclared argument");
            }
        }

        Ok(ToolArguments {
            tool_name: tool_name.to_string(),
            values,
        })
    }
}

/// Arguments that passed schema validation.
///
/// Required parameters are guaranteed present and every present value has
/// its declared kind, so the typed getters only fail on programming errors
/// (asking for an undeclared name or the wrong kind).
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool_name: String,
    values: Map<String, Value>,
}

impl ToolArguments {
    fn missing(&self, name: &str) -> ToolError {
        ToolError::invalid(&self.tool_name, name, "is required")
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.opt_i64(name).ok_or_else(|| self.missing(name))
    }

    pub fn opt_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    pub fn opt_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// The validated mapping as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// What the model sees for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// Declared parameters
    pub parameters: ParameterSchema,
}

/// The core Tool trait.
///
/// A handler receives arguments already validated against its own schema
/// and returns a text payload for the model, or a `ToolError`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "recall", "run_python").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The parameters this tool accepts.
    fn parameters(&self) -> ParameterSchema;

    /// Execute the tool with validated arguments.
    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError>;

    /// Build the descriptor presented to the model.
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// A request to execute a tool, as decoded from a model turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Matches the model's tool call id
    pub call_id: String,

    /// Name of the tool to execute
    pub tool_name: String,

    /// Raw JSON arguments from the model
    pub arguments: String,
}

impl From<&MessageToolCall> for ToolCallRequest {
    fn from(call: &MessageToolCall) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
        }
    }
}

impl ToolCallRequest {
    /// Decode the raw arguments. An empty string means "no arguments".
    pub fn decode_arguments(&self) -> Result<Value, ToolError> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&self.arguments).map_err(|e| {
            ToolError::invalid(&self.tool_name, "<arguments>", format!("are not valid JSON: {e}"))
        })
    }

    /// Arguments decoded as JSON, or the raw text as a string when they do
    /// not parse.
    pub fn arguments_value(&self) -> Value {
        self.decode_arguments()
            .unwrap_or_else(|_| Value::String(self.arguments.clone()))
    }
}

/// The uniform outcome of one dispatched call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The call this result is for
    pub call_id: String,

    /// The tool that was requested
    pub tool_name: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Output on success, error description on failure
    pub payload: String,

    /// Failure classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,

    /// Whether the payload was cut to the size limit
    #[serde(default)]
    pub truncated: bool,
}

impl ToolCallResult {
    /// Convert into the transcript representation.
    pub fn to_content(&self) -> ToolResultContent {
        ToolResultContent {
            tool_call_id: self.call_id.clone(),
            content: self.payload.clone(),
            is_error: !self.success,
        }
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn Tool>,
}

/// A registry of available tools.
///
/// Built once at startup and shared read-only afterwards. The session loop
/// uses it to:
/// 1. Get the catalog to send to the LLM (registration order)
/// 2. Look up handlers when the LLM requests them
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a registry from a list of tools, failing on the first duplicate.
    pub fn from_tools(tools: Vec<Box<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistryError> {
        let descriptor = tool.descriptor();
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler: Arc::from(tool),
        });
        Ok(())
    }

    /// All tool descriptors, in registration order.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Look up the handler for a tool name.
    pub fn handler_for(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i].handler))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Look up a descriptor by name.
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.descriptor.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

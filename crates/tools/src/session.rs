//! End-session tool: the model's way of saying "done for today".
//!
//! The handler itself only echoes the summary back; the session loop
//! recognizes a successful call by name and terminates after the turn.

use async_trait::async_trait;
use freeagent_core::error::ToolError;
use freeagent_core::tool::{END_SESSION_TOOL, ParamKind, ParameterSchema, Tool, ToolArguments};

pub struct EndSessionTool {
    name: String,
}

impl EndSessionTool {
    pub fn new() -> Self {
        Self::named(END_SESSION_TOOL)
    }

    /// Register under a non-default reserved name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EndSessionTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EndSessionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "End today's session. Write a summary of what you did and learned. This exits the loop."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required(
            "summary",
            ParamKind::String,
            "A concise summary of today's session (2-5 sentences)",
        )
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let summary = arguments.str("summary")?.trim();
        if summary.is_empty() {
            return Err(ToolError::invalid(&self.name, "summary", "must not be empty"));
        }
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_summary() {
        let tool = EndSessionTool::new();
        let args = tool
            .parameters()
            .validate(tool.name(), &json!({"summary": "  Read about tides.  "}))
            .unwrap();
        assert_eq!(tool.execute(args).await.unwrap(), "Read about tides.");
    }

    #[tokio::test]
    async fn blank_summary_rejected() {
        let tool = EndSessionTool::named("finish");
        assert_eq!(tool.name(), "finish");
        let args = tool
            .parameters()
            .validate(tool.name(), &json!({"summary": "   "}))
            .unwrap();
        let err = tool.execute(args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn summary_is_required() {
        let tool = EndSessionTool::new();
        let rendered = tool.parameters().to_json_schema();
        assert_eq!(rendered["required"], json!(["summary"]));
    }
}

//! Error types for the freeagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the same request may succeed if sent again: rate limits,
    /// timeouts, dropped connections and server-side (5xx) failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) | Self::InvalidResponse(_) => {
                false
            }
        }
    }
}

/// Failures a tool call can end in.
///
/// All of these are recoverable: the dispatcher turns them into failed
/// `ToolCallResult`s that the model sees on its next turn.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool_name}: parameter '{parameter}' {reason}")]
    InvalidArguments {
        tool_name: String,
        parameter: String,
        reason: String,
    },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    /// Shorthand used by handlers to report a runtime failure.
    pub fn execution(tool_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a single-parameter validation failure.
    pub fn invalid(
        tool_name: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArguments {
            tool_name: tool_name.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// The classification carried into results and the action log.
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::UnknownTool(_) => ToolErrorKind::UnknownTool,
            Self::InvalidArguments { .. } => ToolErrorKind::InvalidArguments,
            Self::Timeout { .. } => ToolErrorKind::Timeout,
            Self::ExecutionFailed { .. } => ToolErrorKind::Execution,
        }
    }
}

/// Serializable classification of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    Timeout,
    Execution,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::UnknownTool => "UnknownToolError",
            Self::InvalidArguments => "InvalidArgumentsError",
            Self::Timeout => "ToolTimeoutError",
            Self::Execution => "ToolExecutionError",
        };
        f.write_str(label)
    }
}

/// Static catalog defects. These abort startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Duplicate tool registration: {0}")]
    DuplicateTool(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Violations of the transcript's turn ordering.
#[derive(Debug, Clone, Error)]
pub enum TranscriptError {
    #[error("Tool results must follow a model turn that requested tools")]
    NoPendingToolCalls,

    #[error("Expected {expected} tool results, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("Tool result #{index} answers '{actual}', expected '{expected}'")]
    ResultOrderMismatch {
        index: usize,
        expected: String,
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn transient_provider_errors() {
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(ProviderError::Network("connection reset".into()).is_transient());
        assert!(ProviderError::Timeout("slow".into()).is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 529,
                message: "overloaded".into()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(!ProviderError::InvalidResponse("truncated".into()).is_transient());
    }

    #[test]
    fn invalid_arguments_names_the_parameter() {
        let err = ToolError::invalid("recall", "query", "is required");
        assert_eq!(
            err.to_string(),
            "Invalid arguments for recall: parameter 'query' is required"
        );
        assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
    }

    #[test]
    fn kind_labels_match_taxonomy() {
        assert_eq!(ToolErrorKind::UnknownTool.to_string(), "UnknownToolError");
        assert_eq!(ToolErrorKind::Timeout.to_string(), "ToolTimeoutError");
        assert_eq!(ToolErrorKind::Execution.to_string(), "ToolExecutionError");
        let json = serde_json::to_string(&ToolErrorKind::InvalidArguments).unwrap();
        assert_eq!(json, "\"invalid_arguments\"");
    }

    #[test]
    fn duplicate_tool_names_the_tool() {
        let err = RegistryError::DuplicateTool("recall".into());
        assert!(err.to_string().contains("recall"));
    }
}

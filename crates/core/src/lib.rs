//! # freeagent Core
//!
//! Domain types, traits, and error definitions for the freeagent session engine.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the session loop is a trait here: the model
//! (`Provider`), the capabilities (`Tool`), long-term memory
//! (`MemoryBackend`) and the session log (`SessionSink`). Implementations live
//! in their respective crates, so tests can swap in scripted stand-ins.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{
    ProviderError, RegistryError, StorageError, ToolError, ToolErrorKind, TranscriptError,
};
pub use memory::{MemoryBackend, MemoryEntry, NewMemory};
pub use message::{Message, MessageToolCall, Role, SessionId, ToolResultContent, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{ActionLogEntry, SessionRecord, SessionSink, TerminationReason};
pub use tool::{
    END_SESSION_TOOL, ParamKind, ParameterSchema, Tool, ToolArguments, ToolCallRequest,
    ToolCallResult, ToolDescriptor, ToolRegistry,
};

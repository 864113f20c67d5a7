//! Built-in tool implementations for freeagent.
//!
//! Tools give the agent the ability to act between sessions' worth of
//! thinking: keep and prune memories, run a bit of Python, check the
//! weather, and end the day.

pub mod code_runner;
pub mod memory_tools;
pub mod session;
pub mod weather;

use freeagent_core::error::RegistryError;
use freeagent_core::memory::MemoryBackend;
use freeagent_core::tool::ToolRegistry;
use std::sync::Arc;

pub use code_runner::RunPythonTool;
pub use memory_tools::{DeleteMemoryTool, RecallTool, RememberTool};
pub use session::EndSessionTool;
pub use weather::WeatherTool;

/// Create the registry with all built-in tools.
///
/// `end_session_tool` is the reserved name the session loop watches for.
/// Registration order is the catalog order the model sees.
pub fn default_registry(
    memory: Arc<dyn MemoryBackend>,
    end_session_tool: &str,
) -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::from_tools(vec![
        Box::new(RememberTool::new(memory.clone())),
        Box::new(RecallTool::new(memory.clone())),
        Box::new(DeleteMemoryTool::new(memory)),
        Box::new(RunPythonTool::new()),
        Box::new(WeatherTool::new()),
        Box::new(EndSessionTool::named(end_session_tool)),
    ])
}

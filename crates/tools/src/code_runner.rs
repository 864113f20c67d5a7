//! Python runner: execute a snippet in a subprocess.
//!
//! stdout and stderr are returned together so the model sees tracebacks.
//! The child is killed when its own timeout fires or when the dispatcher
//! aborts the call.

use async_trait::async_trait;
use freeagent_core::error::ToolError;
use freeagent_core::tool::{ParamKind, ParameterSchema, Tool, ToolArguments};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_INTERPRETER: &str = "python3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_OUTPUT_CHARS: usize = 4000;

pub struct RunPythonTool {
    interpreter: String,
    timeout: Duration,
    max_output_chars: usize,
}

impl RunPythonTool {
    pub fn new() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.into(),
            timeout: DEFAULT_TIMEOUT,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }

    /// Use a different interpreter binary; it is invoked as `<bin> -c <code>`.
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_chars(mut self, max: usize) -> Self {
        self.max_output_chars = max;
        self
    }

    fn cap_output(&self, output: String) -> String {
        if output.chars().count() <= self.max_output_chars {
            return output;
        }
        let kept: String = output.chars().take(self.max_output_chars).collect();
        format!(
            "{kept}\n\n[... output truncated at {} chars ...]",
            self.max_output_chars
        )
    }
}

impl Default for RunPythonTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RunPythonTool {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Execute Python code and return its stdout and stderr. Use it to compute, analyse data, or generate output. Runs with a short timeout."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required("code", ParamKind::String, "The Python source to run")
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let code = arguments.str("code")?;

        debug!(interpreter = %self.interpreter, bytes = code.len(), "Running code");

        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::execution(
                    self.name(),
                    format!("could not start {}: {e}", self.interpreter),
                ));
            }
            Err(_) => {
                return Err(ToolError::execution(
                    self.name(),
                    format!("code execution timed out after {} seconds", self.timeout.as_secs_f32()),
                ));
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(exit_code = code, "Code exited with failure");
            text.push_str(&format!("\n[exit code: {code}]"));
        }

        if text.trim().is_empty() {
            text = "(no output)".into();
        }

        Ok(self.cap_output(text))
    }
}

//! The session engine: the heart of freeagent.
//!
//! A session follows a bounded **ask → act → observe** cycle:
//!
//! 1. **Seed** the transcript with the persona prompt and a kickoff message
//! 2. **Ask** the model, handing it the tool catalog
//! 3. **Act**: dispatch any requested tool calls, with per-call timeouts
//! 4. **Observe**: fold the results back as one tool-results turn
//! 5. **Stop** when the model calls `end_session` or the turn budget runs out
//!
//! Tool failures never abort a session; they are shown to the model.

pub mod context;
pub mod dispatcher;
pub mod prompt;
pub mod session_loop;

#[cfg(test)]
mod test_helpers;

pub use context::{SessionContext, SessionReport, run_and_persist};
pub use dispatcher::{DispatchLimits, Dispatcher};
pub use prompt::{build_system_prompt, kickoff_message};
pub use session_loop::{SessionLoop, SessionOutcome, SessionState};

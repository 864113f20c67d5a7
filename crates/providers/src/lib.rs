//! LLM Provider implementations for freeagent.
//!
//! All providers implement the `freeagent_core::Provider` trait.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

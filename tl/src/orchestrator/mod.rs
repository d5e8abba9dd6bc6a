//! Conversation orchestrator
//!
//! Drives one bounded tool-calling conversation: call the model, dispatch
//! any requested tools, fold the results back in request order, repeat
//! until the model answers without tools or the turn limit is hit.

mod config;
mod conversation;
mod engine;
mod error;

pub use config::OrchestratorConfig;
pub use conversation::{Conversation, ConversationError};
pub use engine::{Orchestrator, RunOutcome, ToolActivity};
pub use error::OrchestrationError;

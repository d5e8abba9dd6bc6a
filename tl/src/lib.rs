//! toolloop - bounded tool-calling conversation loop
//!
//! Sends a conversation to an OpenAI-compatible chat endpoint (Vertex AI's
//! `endpoints/openapi` surface by default), runs the tools the model asks
//! for, feeds the results back in request order, and repeats until the model
//! answers without tools or a turn limit is reached.
//!
//! # Modules
//!
//! - [`orchestrator`] - the conversation loop and its message log
//! - [`tools`] - tool trait, registry, dispatcher and built-in tools
//! - [`llm`] - model client trait and OpenAI-compatible implementation
//! - [`auth`] - bearer-token providers
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod auth;
pub mod cli;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod tools;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, OpenAIClient, ToolCall, create_client};
pub use orchestrator::{Conversation, OrchestrationError, Orchestrator, OrchestratorConfig, RunOutcome, ToolActivity};
pub use tools::{DispatchMode, Tool, ToolDispatcher, ToolError, ToolOutcome, ToolRegistry};

//! Model client for toolloop
//!
//! Provides the `LlmClient` seam the orchestrator talks through, the
//! OpenAI-compatible HTTP implementation, and the shared message types.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage, ToolCall, ToolChoice, ToolDefinition,
};

use crate::auth::{self, TokenProvider};
use crate::config::{AuthConfig, ResolvedLlmConfig};

/// Create the model client described by the configuration
///
/// Builds the token provider selected by `auth` and wires it into an
/// `OpenAIClient` pointed at the resolved endpoint.
pub fn create_client(llm: &ResolvedLlmConfig, auth: &AuthConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(model = %llm.model, source = ?auth.source, "create_client: called");
    let tokens: Arc<dyn TokenProvider> = auth::from_config(auth)?;
    create_client_with_tokens(llm, tokens)
}

/// Create the model client with an explicit token provider
pub fn create_client_with_tokens(
    llm: &ResolvedLlmConfig,
    tokens: Arc<dyn TokenProvider>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %tokens.name(), "create_client_with_tokens: called");
    Ok(Arc::new(OpenAIClient::from_config(llm, tokens)?))
}

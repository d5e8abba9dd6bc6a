//! Tool trait definition

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ToolError;
use crate::llm::ToolDefinition;

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the name in the model's tool call)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object
    fn parameters(&self) -> Value;

    /// Execute the tool
    ///
    /// `args` is always a JSON object. Fields may be missing or of the wrong
    /// type; tools fall back to defaults rather than failing where they can.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;

    /// Catalogue entry advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// Result of one dispatched tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Id of the originating tool call
    pub call_id: String,
    pub tool_name: String,
    /// Structured payload sent back to the model
    pub payload: Value,
    pub is_error: bool,
    pub elapsed: Duration,
}

impl ToolOutcome {
    /// Create a successful outcome
    pub fn success(call_id: impl Into<String>, tool_name: impl Into<String>, payload: Value, elapsed: Duration) -> Self {
        debug!("ToolOutcome::success: called");
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            payload,
            is_error: false,
            elapsed,
        }
    }

    /// Create an error outcome carrying `{"error": "<err>"}`
    pub fn error(call_id: impl Into<String>, tool_name: impl Into<String>, err: &ToolError, elapsed: Duration) -> Self {
        debug!(%err, "ToolOutcome::error: called");
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            payload: serde_json::json!({ "error": err.to_string() }),
            is_error: true,
            elapsed,
        }
    }

    /// Serialized payload for the tool message
    pub fn content(&self) -> String {
        self.payload.to_string()
    }
}

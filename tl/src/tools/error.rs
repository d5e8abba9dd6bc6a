//! Tool error types

use thiserror::Error;

/// Faults raised while invoking a tool
///
/// None of these end a run. The dispatcher renders each one as an
/// `{"error": "<message>"}` payload the model can react to.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool")]
    UnknownTool { name: String },

    #[error("{0}")]
    Execution(String),

    #[error("tool timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("tool panicked")]
    Panicked,
}

/// Problems building a registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool registered twice: {name}")]
    DuplicateTool { name: String },

    #[error("Tool name must not be empty")]
    EmptyName,
}

//! Orchestrator configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::tools::DispatchMode;

/// Bounds and dispatch policy for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum model calls per run
    #[serde(rename = "max-turns", default = "default_max_turns")]
    pub max_turns: u32,

    /// Timeout for each model call in milliseconds
    #[serde(rename = "model-timeout-ms", default = "default_model_timeout")]
    pub model_timeout_ms: u64,

    /// Timeout for each tool invocation in milliseconds
    #[serde(rename = "tool-timeout-ms", default = "default_tool_timeout")]
    pub tool_timeout_ms: u64,

    /// How the tool calls of one turn are executed
    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Optional system message placed before the user prompt
    #[serde(rename = "system-prompt", default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_turns() -> u32 {
    debug!("default_max_turns: called");
    8
}

fn default_model_timeout() -> u64 {
    debug!("default_model_timeout: called");
    120_000 // 2 minutes
}

fn default_tool_timeout() -> u64 {
    debug!("default_tool_timeout: called");
    10_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        debug!("OrchestratorConfig::default: called");
        Self {
            max_turns: default_max_turns(),
            model_timeout_ms: default_model_timeout(),
            tool_timeout_ms: default_tool_timeout(),
            dispatch: DispatchMode::default(),
            system_prompt: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    /// Reject bounds that would make a run impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!(max_turns = self.max_turns, "OrchestratorConfig::validate: called");
        let invalid = |setting: &str, message: &str| ConfigError::InvalidValue {
            setting: format!("orchestrator.{}", setting),
            message: message.to_string(),
        };

        if self.max_turns == 0 {
            return Err(invalid("max-turns", "must be at least 1"));
        }
        if self.model_timeout_ms == 0 {
            return Err(invalid("model-timeout-ms", "must be greater than 0"));
        }
        if self.tool_timeout_ms == 0 {
            return Err(invalid("tool-timeout-ms", "must be greater than 0"));
        }
        Ok(())
    }
}

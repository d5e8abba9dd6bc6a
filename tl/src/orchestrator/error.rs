//! Orchestration error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::tools::RegistryError;

/// Reasons a run ends without a final answer
///
/// Tool faults never show up here; the dispatcher turns them into content
/// the model can react to.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model call failed on turn {turn}: {source}")]
    ModelCallFailed {
        turn: u32,
        #[source]
        source: LlmError,
    },

    #[error("Turn limit exceeded: model was still requesting tools after {limit} calls")]
    TurnLimitExceeded { limit: u32 },

    #[error("Run cancelled")]
    Cancelled,
}

impl OrchestrationError {
    pub fn is_turn_limit(&self) -> bool {
        matches!(self, OrchestrationError::TurnLimitExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestrationError::Cancelled)
    }

    pub fn is_model_call_failed(&self) -> bool {
        matches!(self, OrchestrationError::ModelCallFailed { .. })
    }
}

impl From<ConfigError> for OrchestrationError {
    fn from(err: ConfigError) -> Self {
        OrchestrationError::Configuration(err.to_string())
    }
}

impl From<RegistryError> for OrchestrationError {
    fn from(err: RegistryError) -> Self {
        OrchestrationError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kinds_are_distinct() {
        let limit = OrchestrationError::TurnLimitExceeded { limit: 8 };
        assert!(limit.is_turn_limit());
        assert!(!limit.is_model_call_failed());
        assert!(limit.to_string().contains('8'));

        let failed = OrchestrationError::ModelCallFailed {
            turn: 1,
            source: LlmError::Timeout(Duration::from_secs(1)),
        };
        assert!(failed.is_model_call_failed());
        assert!(!failed.is_turn_limit());

        assert!(OrchestrationError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_registry_error_is_configuration() {
        let err: OrchestrationError = RegistryError::DuplicateTool {
            name: "get_weather".to_string(),
        }
        .into();
        assert!(matches!(err, OrchestrationError::Configuration(msg) if msg.contains("get_weather")));
    }
}

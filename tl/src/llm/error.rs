//! LLM error types

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur during a model call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Credential error: {0}")]
    Credentials(#[from] AuthError),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Check if this error is transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => matches!(*status, 408 | 429 | 500 | 502 | 503 | 504),
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::Auth { .. } => false,
            LlmError::Credentials(_) => false,
            LlmError::InvalidResponse(_) => false,
        }
    }

    /// Delay the server asked for, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> LlmError {
        LlmError::ApiError {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(LlmError::RateLimited { retry_after: None }.is_retryable());

        for status in [408, 429, 500, 502, 503, 504] {
            assert!(api_error(status).is_retryable(), "{status} should retry");
        }
        for status in [400, 404, 422, 501] {
            assert!(!api_error(status).is_retryable(), "{status} should not retry");
        }

        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("no choices".to_string()).is_retryable());
    }

    #[test]
    fn test_auth_is_not_retryable() {
        let err = LlmError::Auth {
            status: 401,
            message: "token expired".to_string(),
        };
        assert!(!err.is_retryable());

        let err = LlmError::Credentials(AuthError::MissingEnv {
            var: "TOKEN".to_string(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(42)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(LlmError::RateLimited { retry_after: None }.retry_after(), None);
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }
}

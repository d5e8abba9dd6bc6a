//! Bearer-token sources for the model endpoint
//!
//! The model client asks a `TokenProvider` for a token before every request.
//! Providers fail fast with an `AuthError` when no credential is available;
//! nothing here retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{AuthConfig, AuthSource};

/// Errors obtaining a bearer token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Environment variable {var} is not set")]
    MissingEnv { var: String },

    #[error("Credential source {source_name} returned an empty token")]
    EmptyToken { source_name: String },

    #[error("Token command `{command}` failed: {message}")]
    Command { command: String, message: String },
}

/// Supplies the bearer token used to authenticate model calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Return a currently valid token
    async fn token(&self) -> Result<String, AuthError>;
}

/// A token fixed at construction
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    fn name(&self) -> &str {
        "static"
    }

    async fn token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::EmptyToken {
                source_name: self.name().to_string(),
            });
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    fn name(&self) -> &str {
        &self.var
    }

    async fn token(&self) -> Result<String, AuthError> {
        debug!(var = %self.var, "EnvToken::token: called");
        let token = std::env::var(&self.var).map_err(|_| AuthError::MissingEnv { var: self.var.clone() })?;
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(AuthError::EmptyToken {
                source_name: self.var.clone(),
            });
        }
        Ok(token)
    }
}

/// Runs a command (by default `gcloud auth print-access-token`) and caches its output
pub struct CommandToken {
    program: String,
    args: Vec<String>,
    ttl: Duration,
    cached: Mutex<Option<(String, Instant)>>,
}

impl CommandToken {
    pub fn new(command: &[String], ttl: Duration) -> Result<Self, AuthError> {
        let (program, args) = command.split_first().ok_or_else(|| AuthError::Command {
            command: String::new(),
            message: "empty command".to_string(),
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            ttl,
            cached: Mutex::new(None),
        })
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn fetch(&self) -> Result<String, AuthError> {
        debug!(command = %self.command_line(), "CommandToken::fetch: called");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| AuthError::Command {
                command: self.command_line(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AuthError::Command {
                command: self.command_line(),
                message: format!("exit status {}: {}", output.status, stderr),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AuthError::EmptyToken {
                source_name: self.command_line(),
            });
        }
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for CommandToken {
    fn name(&self) -> &str {
        &self.program
    }

    async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                debug!("CommandToken::token: cache hit");
                return Ok(token.clone());
            }
        }

        let token = self.fetch().await?;
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// Build the token provider selected in the config
pub fn from_config(config: &AuthConfig) -> Result<Arc<dyn TokenProvider>, AuthError> {
    debug!(source = ?config.source, "auth::from_config: called");
    match config.source {
        AuthSource::Env => Ok(Arc::new(EnvToken::new(&config.token_env))),
        AuthSource::Command => Ok(Arc::new(CommandToken::new(
            &config.command,
            Duration::from_secs(config.cache_secs),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(StaticToken::new("abc").token().await.unwrap(), "abc");
        assert!(matches!(
            StaticToken::new("").token().await,
            Err(AuthError::EmptyToken { .. })
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_token_missing() {
        unsafe { std::env::remove_var("TOOLLOOP_TEST_TOKEN") };
        let err = EnvToken::new("TOOLLOOP_TEST_TOKEN").token().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingEnv { ref var } if var == "TOOLLOOP_TEST_TOKEN"));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_token_trims() {
        unsafe { std::env::set_var("TOOLLOOP_TEST_TOKEN", "  ya29.token\n") };
        let token = EnvToken::new("TOOLLOOP_TEST_TOKEN").token().await.unwrap();
        assert_eq!(token, "ya29.token");
        unsafe { std::env::remove_var("TOOLLOOP_TEST_TOKEN") };
    }

    #[tokio::test]
    async fn test_command_token_caches_output() {
        let provider = CommandToken::new(
            &["echo".to_string(), "cmd-token".to_string()],
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(provider.token().await.unwrap(), "cmd-token");
        assert!(provider.cached.lock().await.is_some());
        assert_eq!(provider.token().await.unwrap(), "cmd-token");
    }

    #[tokio::test]
    async fn test_command_token_failure() {
        let provider = CommandToken::new(&["false".to_string()], Duration::from_secs(60)).unwrap();
        assert!(matches!(provider.token().await, Err(AuthError::Command { .. })));
    }

    #[test]
    fn test_command_token_rejects_empty_command() {
        assert!(CommandToken::new(&[], Duration::from_secs(1)).is_err());
    }
}

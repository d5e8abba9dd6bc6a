//! toolloop configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::orchestrator::OrchestratorConfig;

/// Startup configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {setting}: set llm.{setting} in the config or the {env} environment variable")]
    MissingSetting { setting: String, env: String },

    #[error("Invalid value for {setting}: {message}")]
    InvalidValue { setting: String, message: String },
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model endpoint configuration
    pub llm: LlmConfig,

    /// Credential source
    pub auth: AuthConfig,

    /// Conversation loop bounds
    pub orchestrator: OrchestratorConfig,

    /// Built-in tool settings
    pub tools: ToolsConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Resolves the endpoint settings and checks the loop bounds so startup
    /// fails with a clear message instead of mid-run.
    pub fn validate(&self) -> Result<ResolvedLlmConfig, ConfigError> {
        debug!("Config::validate: called");
        self.orchestrator.validate()?;
        self.llm.resolve()
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .toolloop.yml
        let local_config = PathBuf::from(".toolloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/toolloop/toolloop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("toolloop").join("toolloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Full base URL; when set, project and location are not needed
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Base URL template with `{project}` and `{location}` placeholders
    #[serde(rename = "base-url-template")]
    pub base_url_template: String,

    /// Cloud project id (falls back to `project-env`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Cloud location (falls back to `location-env`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Environment variable holding the project id
    #[serde(rename = "project-env")]
    pub project_env: String,

    /// Environment variable holding the location
    #[serde(rename = "location-env")]
    pub location_env: String,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient HTTP failures (0 disables retrying)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Provider extension merged into every request body
    #[serde(rename = "extra-body")]
    pub extra_body: serde_json::Value,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "google/gemini-3-pro-preview".to_string(),
            base_url: None,
            base_url_template: "https://aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/endpoints/openapi"
                .to_string(),
            project: None,
            location: None,
            project_env: "GOOGLE_CLOUD_PROJECT".to_string(),
            location_env: "GOOGLE_CLOUD_LOCATION".to_string(),
            timeout_ms: 120_000,
            max_retries: 3,
            extra_body: serde_json::json!({
                "google": {
                    "thinking_config": {
                        "include_thoughts": true
                    }
                }
            }),
        }
    }
}

impl LlmConfig {
    /// Resolve the endpoint URL and request settings
    pub fn resolve(&self) -> Result<ResolvedLlmConfig, ConfigError> {
        debug!(model = %self.model, "LlmConfig::resolve: called");
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                setting: "llm.model".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let base_url = match &self.base_url {
            Some(url) => {
                debug!("LlmConfig::resolve: explicit base-url");
                url.clone()
            }
            None => {
                let project = Self::setting(self.project.as_deref(), "project", &self.project_env)?;
                let location = Self::setting(self.location.as_deref(), "location", &self.location_env)?;
                self.base_url_template
                    .replace("{project}", &project)
                    .replace("{location}", &location)
            }
        };

        let extra_body = match &self.extra_body {
            serde_json::Value::Null => None,
            serde_json::Value::Object(map) if map.is_empty() => None,
            serde_json::Value::Object(_) => Some(self.extra_body.clone()),
            _ => {
                return Err(ConfigError::InvalidValue {
                    setting: "llm.extra-body".to_string(),
                    message: "must be a mapping".to_string(),
                });
            }
        };

        Ok(ResolvedLlmConfig {
            model: self.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            extra_body,
        })
    }

    fn setting(configured: Option<&str>, setting: &str, env: &str) -> Result<String, ConfigError> {
        let value = configured
            .map(str::to_string)
            .or_else(|| std::env::var(env).ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        value.ok_or_else(|| ConfigError::MissingSetting {
            setting: setting.to_string(),
            env: env.to_string(),
        })
    }
}

/// Endpoint settings after project/location resolution
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub extra_body: Option<serde_json::Value>,
}

/// Where the bearer token comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    /// Read from `token-env`
    Env,
    /// Run `command` and use its stdout
    Command,
}

/// Credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub source: AuthSource,

    /// Environment variable holding an access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Token command and arguments
    pub command: Vec<String>,

    /// How long a command-issued token is reused, in seconds
    #[serde(rename = "cache-secs")]
    pub cache_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            source: AuthSource::Command,
            token_env: "GOOGLE_OAUTH_ACCESS_TOKEN".to_string(),
            command: vec![
                "gcloud".to_string(),
                "auth".to_string(),
                "print-access-token".to_string(),
            ],
            cache_secs: 3000,
        }
    }
}

/// Built-in tool settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Fixed seed for the weather tool; random when unset
    #[serde(rename = "weather-seed", skip_serializing_if = "Option::is_none")]
    pub weather_seed: Option<u64>,
}

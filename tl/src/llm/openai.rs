//! OpenAI-compatible Chat Completions client
//!
//! Talks to any endpoint speaking the Chat Completions wire format. The
//! default target is Vertex AI's `endpoints/openapi` surface, which needs a
//! bearer token from a `TokenProvider` and accepts Gemini-specific settings
//! through top-level extension fields (`extra_body`).

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, Role, StopReason, TokenUsage, ToolCall};
use crate::auth::TokenProvider;
use crate::config::ResolvedLlmConfig;

/// Initial backoff delay for retries
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Upper bound on the exponential backoff
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Upper bound on a server-requested retry delay
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Double the backoff, staying under `MAX_BACKOFF`
fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2).min(MAX_BACKOFF)
}

/// Read a `Retry-After` header given in seconds, capped at `MAX_RETRY_AFTER_SECS`
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// OpenAI-compatible API client
pub struct OpenAIClient {
    model: String,
    base_url: String,
    extra_body: Option<Value>,
    max_retries: u32,
    initial_backoff: Duration,
    timeout: Duration,
    http: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl OpenAIClient {
    /// Create a new client from resolved configuration
    pub fn from_config(config: &ResolvedLlmConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAIClient::from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            extra_body: config.extra_body.clone(),
            max_retries: config.max_retries,
            initial_backoff: INITIAL_BACKOFF,
            timeout,
            http,
            tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the Chat Completions API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        debug!(%request.model, message_count = %request.messages.len(), "OpenAIClient::build_request_body: called");

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": self.convert_messages(&request.messages),
        });

        if !request.tools.is_empty() {
            debug!(tool_count = %request.tools.len(), "OpenAIClient::build_request_body: adding tools");
            body["tools"] = Value::Array(request.tools.iter().map(|t| t.to_openai_schema()).collect());
            body["tool_choice"] = Value::from(request.tool_choice.as_str());
        } else {
            debug!("OpenAIClient::build_request_body: no tools");
        }

        // Request-level extension wins over the client default
        if let Some(extra) = request.extra_body.as_ref().or(self.extra_body.as_ref()) {
            merge_extra_body(&mut body, extra);
        }

        body
    }

    /// Convert conversation messages to wire format
    ///
    /// Assistant tool calls go out with their raw argument text, and any
    /// `extra_content` the provider attached comes back exactly as received.
    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        debug!(message_count = %messages.len(), "OpenAIClient::convert_messages: called");

        messages
            .iter()
            .map(|msg| {
                let mut wire = serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                });

                match msg.role {
                    Role::Assistant if msg.has_tool_calls() => {
                        let calls: Vec<Value> = msg
                            .tool_calls
                            .iter()
                            .map(|tc| {
                                let mut call = serde_json::json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments,
                                    }
                                });
                                if let Some(extra) = &tc.extra_content {
                                    call["extra_content"] = extra.clone();
                                }
                                call
                            })
                            .collect();
                        wire["tool_calls"] = Value::Array(calls);
                        if msg.content.is_empty() {
                            wire["content"] = Value::Null;
                        }
                    }
                    Role::Tool => {
                        wire["tool_call_id"] = Value::from(msg.tool_call_id.clone().unwrap_or_default());
                    }
                    _ => {}
                }

                if let Some(extra) = &msg.extra_content {
                    wire["extra_content"] = extra.clone();
                }
                wire
            })
            .collect()
    }

    /// Parse the API response
    fn parse_response(&self, api_response: OpenAIResponse) -> Result<CompletionResponse, LlmError> {
        debug!(choice_count = %api_response.choices.len(), "OpenAIClient::parse_response: called");
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
                extra_content: tc.extra_content,
            })
            .collect();

        let content = choice.message.content.unwrap_or_default();
        let mut message = if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_tool_calls(content, tool_calls)
        };
        message.extra_content = choice.message.extra_content;

        let usage = api_response.usage.unwrap_or_default();

        Ok(CompletionResponse {
            message,
            stop_reason: StopReason::from_openai(choice.finish_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

/// Merge provider extension fields into the top level of a request body
///
/// Objects merge key by key so a nested extension extends rather than
/// replaces what is already there; any other value overwrites.
fn merge_extra_body(body: &mut Value, extra: &Value) {
    match (body, extra) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => merge_extra_body(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "OpenAIClient::complete: called");
        let url = self.endpoint();
        let body = self.build_request_body(&request);

        let mut backoff = self.initial_backoff;
        let mut attempt = 0;
        loop {
            match self.send_once(&url, &body).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = err.retry_after().unwrap_or(backoff);
                    warn!(attempt, ?delay, error = %err, "OpenAIClient::complete: retrying after transient error");
                    tokio::time::sleep(delay).await;
                    backoff = next_backoff(backoff);
                }
                Err(err) => {
                    debug!(attempt, error = %err, "OpenAIClient::complete: giving up");
                    return Err(err);
                }
            }
        }
    }
}

impl OpenAIClient {
    /// One HTTP round trip, with the response status mapped onto `LlmError`
    async fn send_once(&self, url: &str, body: &Value) -> Result<CompletionResponse, LlmError> {
        let token = self.tokens.token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            let message = response.text().await.unwrap_or_default();
            debug!(status, "OpenAIClient::send_once: authentication rejected");
            return Err(LlmError::Auth { status, message });
        }

        if status == 429 {
            let retry_after = parse_retry_after(response.headers());
            debug!(?retry_after, "OpenAIClient::send_once: rate limited (429)");
            return Err(LlmError::RateLimited { retry_after });
        }

        if !response.status().is_success() {
            debug!(status, "OpenAIClient::send_once: API error");
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message });
        }

        let text = response.text().await?;
        let api_response: OpenAIResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("malformed response body: {}", e)))?;
        self.parse_response(api_response)
    }
}

// Chat Completions response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default)]
    extra_content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
    #[serde(default)]
    extra_content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

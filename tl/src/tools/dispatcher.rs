//! ToolDispatcher - runs tool calls and absorbs every tool fault

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Resolution, ToolError, ToolOutcome, ToolRegistry};
use crate::llm::ToolCall;

/// How the calls of one assistant turn are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// All calls of a turn run in parallel
    #[default]
    Concurrent,
    /// One call at a time, in request order
    Sequential,
}

/// Aborts the handler task if the dispatch future is dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Invokes tools from a registry
///
/// `invoke` is total: unknown names, handler errors, panics and timeouts all
/// come back as an error `ToolOutcome` instead of escaping to the caller.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    /// Create a dispatcher with a per-invocation timeout
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        debug!(tool_count = %registry.len(), ?timeout, "ToolDispatcher::new: called");
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run a single tool call
    pub async fn invoke(&self, call: &ToolCall) -> ToolOutcome {
        debug!(id = %call.id, name = %call.name, "ToolDispatcher::invoke: called");
        let started = Instant::now();

        let tool = match self.registry.resolve(&call.name) {
            Resolution::Found(tool) => tool,
            Resolution::NotFound => {
                warn!(id = %call.id, name = %call.name, "ToolDispatcher::invoke: unknown tool");
                let err = ToolError::UnknownTool {
                    name: call.name.clone(),
                };
                return ToolOutcome::error(&call.id, &call.name, &err, started.elapsed());
            }
        };

        let args = parse_arguments(&call.name, &call.arguments);

        // A separate task keeps a panicking handler from unwinding into the run
        let mut task = AbortOnDrop(tokio::spawn(async move { tool.call(args).await }));

        let result = match tokio::time::timeout(self.timeout, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                warn!(id = %call.id, name = %call.name, "ToolDispatcher::invoke: tool panicked");
                Err(ToolError::Panicked)
            }
            Ok(Err(join_err)) => Err(ToolError::Execution(join_err.to_string())),
            Err(_) => {
                warn!(id = %call.id, name = %call.name, timeout_ms = %self.timeout.as_millis(), "ToolDispatcher::invoke: tool timed out");
                Err(ToolError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };
        drop(task);

        let elapsed = started.elapsed();
        match result {
            Ok(payload) => {
                debug!(id = %call.id, ?elapsed, "ToolDispatcher::invoke: success");
                ToolOutcome::success(&call.id, &call.name, payload, elapsed)
            }
            Err(err) => {
                debug!(id = %call.id, %err, "ToolDispatcher::invoke: tool error");
                ToolOutcome::error(&call.id, &call.name, &err, elapsed)
            }
        }
    }

    /// Run every call of one assistant turn
    ///
    /// Returns exactly one outcome per call, in the order the calls were
    /// given, whatever order they finish in.
    pub async fn invoke_all(&self, calls: &[ToolCall], mode: DispatchMode) -> Vec<ToolOutcome> {
        debug!(call_count = %calls.len(), ?mode, "ToolDispatcher::invoke_all: called");
        match mode {
            DispatchMode::Concurrent => futures::future::join_all(calls.iter().map(|call| self.invoke(call))).await,
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(calls.len());
                for call in calls {
                    outcomes.push(self.invoke(call).await);
                }
                outcomes
            }
        }
    }
}

/// Parse raw argument text into a JSON object
///
/// Empty text, malformed JSON and non-object JSON all become `{}` so the
/// tool runs with its defaults. The latter two are logged as warnings.
pub fn parse_arguments(tool_name: &str, raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        debug!(%tool_name, "parse_arguments: empty arguments");
        return Value::Object(Default::default());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(%tool_name, kind = %json_kind(&other), "parse_arguments: arguments are not an object, using defaults");
            Value::Object(Default::default())
        }
        Err(e) => {
            warn!(%tool_name, error = %e, "parse_arguments: malformed arguments, using defaults");
            Value::Object(Default::default())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

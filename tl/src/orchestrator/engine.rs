//! Orchestrator - the bounded model/tool conversation loop

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Conversation, ConversationError, OrchestrationError, OrchestratorConfig};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage, ToolChoice, ToolDefinition};
use crate::tools::{ToolDispatcher, ToolOutcome, ToolRegistry};

/// One dispatched tool call, as reported after a run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolActivity {
    /// Turn whose assistant message requested the call (1-based)
    pub turn: u32,
    pub call_id: String,
    pub tool_name: String,
    /// Raw argument text the model sent
    pub arguments: String,
    pub is_error: bool,
    pub elapsed: Duration,
}

/// What a successful run leaves behind
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Content of the final tool-free assistant message
    pub answer: String,
    /// Model calls made
    pub turns: u32,
    /// Token usage summed over all model calls
    pub usage: TokenUsage,
    /// Every tool call dispatched, in conversation order
    pub tool_activity: Vec<ToolActivity>,
}

/// Runs tool-calling conversations against one model client and registry
///
/// Holds no per-run state: each `run` builds its own `Conversation`, so one
/// orchestrator may serve concurrent runs.
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    config: OrchestratorConfig,
    model: String,
    extra_body: Option<Value>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        debug!(%model, max_turns = config.max_turns, dispatch = ?config.dispatch, "Orchestrator::new: called");
        let dispatcher = ToolDispatcher::new(registry, config.tool_timeout());
        Self {
            llm,
            dispatcher,
            config,
            model,
            extra_body: None,
        }
    }

    /// Provider extension sent with every model call
    pub fn with_extra_body(mut self, extra_body: Option<Value>) -> Self {
        self.extra_body = extra_body;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a conversation to completion
    pub async fn run(&self, user_message: &str) -> Result<RunOutcome, OrchestrationError> {
        self.run_with_cancel(user_message, &CancellationToken::new()).await
    }

    /// Run a conversation, aborting as soon as `cancel` fires
    ///
    /// Cancellation drops the in-flight model call or the whole dispatch
    /// phase; results of tools that already finished are discarded.
    pub async fn run_with_cancel(
        &self,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, OrchestrationError> {
        debug!(prompt_len = user_message.len(), "Orchestrator::run_with_cancel: called");
        self.config.validate()?;

        let limit = self.config.max_turns;
        let tools = self.dispatcher.registry().definitions();
        let mut conversation = Conversation::new(self.config.system_prompt.as_deref(), user_message);
        let mut usage = TokenUsage::default();
        let mut tool_activity = Vec::new();

        for turn in 1..=limit {
            debug!(turn, limit, messages = conversation.len(), "Orchestrator::run_with_cancel: turn start");

            let response = self.call_model(turn, &conversation, &tools, cancel).await?;
            usage.add(&response.usage);

            let message = response.message;
            let calls = message.tool_calls.clone();
            conversation
                .push_assistant(message.clone())
                .map_err(|err| malformed_reply(turn, err))?;

            if calls.is_empty() {
                info!(turn, total_tokens = usage.total(), "Run complete");
                return Ok(RunOutcome {
                    answer: message.content,
                    turns: turn,
                    usage,
                    tool_activity,
                });
            }

            if turn == limit {
                warn!(limit, pending = calls.len(), "Turn limit reached with tool calls outstanding");
                return Err(OrchestrationError::TurnLimitExceeded { limit });
            }

            info!(turn, call_count = calls.len(), "Dispatching tool calls");
            let outcomes = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(turn, "Orchestrator::run_with_cancel: cancelled during dispatch");
                    return Err(OrchestrationError::Cancelled);
                }
                outcomes = self.dispatcher.invoke_all(&calls, self.config.dispatch) => outcomes,
            };

            tool_activity.extend(
                calls
                    .iter()
                    .zip(&outcomes)
                    .map(|(call, outcome)| activity(turn, &call.arguments, outcome)),
            );
            conversation
                .push_tool_results(&outcomes)
                .map_err(|err| malformed_reply(turn, err))?;
        }

        Err(OrchestrationError::TurnLimitExceeded { limit })
    }

    async fn call_model(
        &self,
        turn: u32,
        conversation: &Conversation,
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, OrchestrationError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            tools: tools.to_vec(),
            tool_choice: ToolChoice::Auto,
            extra_body: self.extra_body.clone(),
        };
        let timeout = self.config.model_timeout();

        debug!(turn, "Orchestrator::call_model: calling LLM");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(turn, "Orchestrator::call_model: cancelled");
                return Err(OrchestrationError::Cancelled);
            }
            result = tokio::time::timeout(timeout, self.llm.complete(request)) => result,
        };

        match result {
            Ok(Ok(response)) => {
                debug!(turn, stop_reason = ?response.stop_reason, call_count = response.message.tool_calls.len(), "Orchestrator::call_model: response received");
                Ok(response)
            }
            Ok(Err(source)) => {
                warn!(turn, error = %source, "Model call failed");
                Err(OrchestrationError::ModelCallFailed { turn, source })
            }
            Err(_) => {
                warn!(turn, ?timeout, "Model call timed out");
                Err(OrchestrationError::ModelCallFailed {
                    turn,
                    source: LlmError::Timeout(timeout),
                })
            }
        }
    }
}

/// A reply the conversation log cannot accept, such as a reused call id
fn malformed_reply(turn: u32, err: ConversationError) -> OrchestrationError {
    warn!(turn, error = %err, "Model reply rejected by conversation log");
    OrchestrationError::ModelCallFailed {
        turn,
        source: LlmError::InvalidResponse(err.to_string()),
    }
}

fn activity(turn: u32, arguments: &str, outcome: &ToolOutcome) -> ToolActivity {
    ToolActivity {
        turn,
        call_id: outcome.call_id.clone(),
        tool_name: outcome.tool_name.clone(),
        arguments: arguments.to_string(),
        is_error: outcome.is_error,
        elapsed: outcome.elapsed,
    }
}

//! Integration tests for toolloop
//!
//! These drive full conversations through the public API with a scripted
//! model client standing in for the HTTP endpoint.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use toolloop::config::ToolsConfig;
use toolloop::llm::{
    CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, Role, StopReason, TokenUsage, ToolCall,
};
use toolloop::orchestrator::{OrchestrationError, Orchestrator, OrchestratorConfig};
use toolloop::tools::ToolRegistry;

// =============================================================================
// Scripted model client
// =============================================================================

/// Replays canned assistant messages and records every request
struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let message = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))?;
        let stop_reason = if message.has_tool_calls() {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };
        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 20,
            },
        })
    }
}

fn call(id: &str, name: &str, arguments: &str) -> Message {
    Message::assistant_tool_calls("", vec![ToolCall::new(id, name, arguments)])
}

fn orchestrator(model: Arc<ScriptedModel>, config: OrchestratorConfig) -> Orchestrator {
    let registry = ToolRegistry::standard(&ToolsConfig { weather_seed: Some(2024) }).expect("registry");
    Orchestrator::new(model, Arc::new(registry), config, "google/gemini-3-pro-preview")
}

/// Tool messages of a request as (call id, parsed payload)
fn tool_results(request: &CompletionRequest) -> Vec<(String, Value)> {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| {
            (
                m.tool_call_id.clone().expect("tool message id"),
                serde_json::from_str(&m.content).expect("tool payload is JSON"),
            )
        })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_weather_question_answered_after_tool_call() {
    let model = ScriptedModel::new(vec![
        call("call_w", "get_weather", r#"{"city":"Seattle"}"#),
        Message::assistant("It's wet in Seattle; bring an umbrella."),
    ]);

    let outcome = orchestrator(model.clone(), OrchestratorConfig::default())
        .run("what's the weather in Seattle")
        .await
        .expect("run succeeds");

    assert_eq!(outcome.answer, "It's wet in Seattle; bring an umbrella.");
    assert_eq!(outcome.turns, 2);
    assert_eq!(outcome.usage.input_tokens, 200);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);

    let catalogue: Vec<_> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(catalogue, vec!["get_weather", "get_current_time"]);

    let results = tool_results(&requests[1]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_w");
    assert_eq!(results[0].1["city"], "Seattle");
    let condition = results[0].1["condition"].as_str().expect("condition");
    assert!(["rain", "sunny", "cloudy", "windy"].contains(&condition));
}

#[tokio::test]
async fn test_unregistered_tool_gets_error_payload() {
    let model = ScriptedModel::new(vec![
        call("call_s", "get_stock_price", r#"{"symbol":"GOOG"}"#),
        Message::assistant("Sorry, I can't check stock prices."),
    ]);

    let outcome = orchestrator(model.clone(), OrchestratorConfig::default())
        .run("How is GOOG doing?")
        .await
        .expect("run succeeds");

    assert_eq!(outcome.answer, "Sorry, I can't check stock prices.");
    assert_eq!(outcome.tool_activity.len(), 1);
    assert!(outcome.tool_activity[0].is_error);

    let results = tool_results(&model.requests()[1]);
    assert_eq!(results, vec![("call_s".to_string(), json!({"error": "unknown tool"}))]);
}

#[tokio::test]
async fn test_invalid_timezone_still_answers() {
    let model = ScriptedModel::new(vec![
        call("call_t", "get_current_time", r#"{"timezone":"Not/AZone"}"#),
        Message::assistant("Here is the local time."),
    ]);

    let outcome = orchestrator(model.clone(), OrchestratorConfig::default())
        .run("What time is it in Not/AZone?")
        .await
        .expect("run succeeds");

    assert_eq!(outcome.answer, "Here is the local time.");
    assert!(!outcome.tool_activity[0].is_error);

    let results = tool_results(&model.requests()[1]);
    assert_eq!(results[0].0, "call_t");
    assert_eq!(results[0].1["timezone"], "Not/AZone");
    let timestamp = results[0].1["timestamp"].as_str().expect("timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

// =============================================================================
// Bounds and ordering
// =============================================================================

#[tokio::test]
async fn test_parallel_calls_answered_in_request_order() {
    let model = ScriptedModel::new(vec![
        Message::assistant_tool_calls(
            "Let me check.",
            vec![
                ToolCall::new("w1", "get_weather", r#"{"city":"Seattle"}"#),
                ToolCall::new("t1", "get_current_time", r#"{"timezone":"America/Los_Angeles"}"#),
                ToolCall::new("x1", "get_stock_price", "{}"),
            ],
        ),
        Message::assistant("Umbrella yes; it's afternoon."),
    ]);

    orchestrator(model.clone(), OrchestratorConfig::default())
        .run("weather and time?")
        .await
        .expect("run succeeds");

    let ids: Vec<_> = tool_results(&model.requests()[1]).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["w1", "t1", "x1"]);
}

#[tokio::test]
async fn test_endless_tool_calls_hit_turn_limit() {
    let replies = (0..10)
        .map(|i| call(&format!("loop_{}", i), "get_weather", r#"{"city":"Seattle"}"#))
        .collect();
    let model = ScriptedModel::new(replies);
    let config = OrchestratorConfig {
        max_turns: 4,
        ..Default::default()
    };

    let err = orchestrator(model.clone(), config)
        .run("keep going")
        .await
        .expect_err("run must stop");

    assert!(err.is_turn_limit());
    assert!(matches!(err, OrchestrationError::TurnLimitExceeded { limit: 4 }));
    assert_eq!(model.requests().len(), 4);
}

#[tokio::test]
async fn test_registry_shared_across_concurrent_runs() {
    let registry = Arc::new(ToolRegistry::standard(&ToolsConfig::default()).expect("registry"));

    let mut handles = Vec::new();
    for i in 0..4 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let model = ScriptedModel::new(vec![
                call(&format!("c{}", i), "get_weather", r#"{"city":"Oslo"}"#),
                Message::assistant(format!("answer {}", i)),
            ]);
            let config = OrchestratorConfig {
                tool_timeout_ms: 2_000,
                ..Default::default()
            };
            Orchestrator::new(model, registry, config, "m").run("weather?").await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run finishes")
            .expect("task joins")
            .expect("run succeeds");
        assert_eq!(outcome.answer, format!("answer {}", i));
    }
}

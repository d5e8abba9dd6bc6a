//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless chat-completion client - each call carries the full conversation
///
/// The orchestrator owns the message log and resends all of it on every
/// call; implementations keep no conversation state between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    use crate::llm::{Message, StopReason, TokenUsage, ToolCall};

    /// One scripted reaction of the mock client
    #[derive(Debug, Clone)]
    pub enum MockStep {
        /// Return this response
        Respond(CompletionResponse),
        /// Fail with an API error
        Fail { status: u16, message: String },
        /// Request one tool call with a fresh id derived from the call index
        FreshToolCall { name: String, arguments: String },
        /// Never return
        Hang,
    }

    /// Mock LLM client for unit tests
    pub struct MockLlmClient {
        steps: Vec<MockStep>,
        repeat_last: bool,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::scripted(responses.into_iter().map(MockStep::Respond).collect())
        }

        pub fn scripted(steps: Vec<MockStep>) -> Self {
            Self {
                steps,
                repeat_last: false,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Keep replaying the final step once the script runs out
        pub fn repeating(mut self) -> Self {
            self.repeat_last = true;
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Every request received so far, in order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    /// A tool-free final answer
    pub fn text_response(content: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(content),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        }
    }

    /// An assistant turn requesting the given `(id, name, arguments)` calls
    pub fn tool_response(calls: &[(&str, &str, &str)]) -> CompletionResponse {
        let calls = calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect();
        CompletionResponse {
            message: Message::assistant_tool_calls("", calls),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);

            let step = match self.steps.get(idx) {
                Some(step) => step.clone(),
                None if self.repeat_last && !self.steps.is_empty() => self.steps[self.steps.len() - 1].clone(),
                None => {
                    debug!("MockLlmClient::complete: no more mock responses");
                    return Err(LlmError::InvalidResponse("No more mock responses".to_string()));
                }
            };

            match step {
                MockStep::Respond(response) => Ok(response),
                MockStep::Fail { status, message } => Err(LlmError::ApiError { status, message }),
                MockStep::FreshToolCall { name, arguments } => {
                    let id = format!("call_{}", idx + 1);
                    Ok(tool_response(&[(id.as_str(), name.as_str(), arguments.as_str())]))
                }
                MockStep::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::llm::ToolChoice;

        fn request() -> CompletionRequest {
            CompletionRequest {
                model: "test-model".to_string(),
                messages: vec![Message::user("Hi")],
                tools: vec![],
                tool_choice: ToolChoice::Auto,
                extra_body: None,
            }
        }

        #[tokio::test]
        async fn test_mock_client_returns_responses_in_order() {
            let client = MockLlmClient::new(vec![text_response("one"), text_response("two")]);

            let first = client.complete(request()).await.unwrap();
            assert_eq!(first.message.content, "one");

            let second = client.complete(request()).await.unwrap();
            assert_eq!(second.message.content, "two");

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            assert!(client.complete(request()).await.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_repeats_last_step() {
            let client = MockLlmClient::scripted(vec![MockStep::FreshToolCall {
                name: "get_weather".to_string(),
                arguments: "{}".to_string(),
            }])
            .repeating();

            for turn in 1..=3 {
                let response = client.complete(request()).await.unwrap();
                assert_eq!(response.message.tool_calls[0].id, format!("call_{}", turn));
            }
            assert_eq!(client.call_count(), 3);
        }
    }
}

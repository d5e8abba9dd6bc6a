//! Conversation - the append-only message log of one run

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::llm::{Message, Role};
use crate::tools::ToolOutcome;

/// A message that would break the pairing rules of the log
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("expected an assistant message, got {role}")]
    UnexpectedRole { role: Role },

    #[error("assistant message sent while {count} tool call(s) are still unanswered")]
    UnansweredCalls { count: usize },

    #[error("tool call has an empty id")]
    EmptyCallId,

    #[error("tool call id reused: {id}")]
    DuplicateCallId { id: String },

    #[error("tool results do not answer the pending calls: expected {expected:?}, got {got:?}")]
    ResultMismatch { expected: Vec<String>, got: Vec<String> },
}

/// Ordered message log
///
/// Every tool message answers exactly one call of the assistant message
/// right before it, and all of those calls are answered before another
/// assistant message is accepted. Call ids are unique for the whole run.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    seen_ids: HashSet<String>,
    pending: Vec<String>,
}

impl Conversation {
    /// Start a conversation from an optional system prompt and the user's message
    pub fn new(system_prompt: Option<&str>, user_message: impl Into<String>) -> Self {
        debug!(has_system = system_prompt.is_some(), "Conversation::new: called");
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(user_message));
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Append the model's reply
    pub fn push_assistant(&mut self, message: Message) -> Result<(), ConversationError> {
        debug!(call_count = %message.tool_calls.len(), "Conversation::push_assistant: called");
        if message.role != Role::Assistant {
            return Err(ConversationError::UnexpectedRole { role: message.role });
        }
        if !self.pending.is_empty() {
            return Err(ConversationError::UnansweredCalls {
                count: self.pending.len(),
            });
        }

        let mut ids = Vec::with_capacity(message.tool_calls.len());
        for call in &message.tool_calls {
            if call.id.is_empty() {
                return Err(ConversationError::EmptyCallId);
            }
            if self.seen_ids.contains(&call.id) || ids.contains(&call.id) {
                return Err(ConversationError::DuplicateCallId { id: call.id.clone() });
            }
            ids.push(call.id.clone());
        }

        self.seen_ids.extend(ids.iter().cloned());
        self.pending = ids;
        self.messages.push(message);
        Ok(())
    }

    /// Append the results of the pending calls
    ///
    /// `outcomes` must answer the pending calls one-to-one and in the same
    /// order; otherwise nothing is appended.
    pub fn push_tool_results(&mut self, outcomes: &[ToolOutcome]) -> Result<(), ConversationError> {
        debug!(outcome_count = %outcomes.len(), "Conversation::push_tool_results: called");
        let matches = outcomes.len() == self.pending.len()
            && outcomes.iter().zip(&self.pending).all(|(o, id)| &o.call_id == id);
        if !matches {
            return Err(ConversationError::ResultMismatch {
                expected: self.pending.clone(),
                got: outcomes.iter().map(|o| o.call_id.clone()).collect(),
            });
        }

        self.messages
            .extend(outcomes.iter().map(|o| Message::tool(&o.call_id, o.content())));
        self.pending.clear();
        Ok(())
    }

    /// Whether the log is ready to be sent to the model
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

//! LLM request/response types
//!
//! Modeled on chat-completion APIs: a system prompt plus user/assistant turns.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (the selected evaluation template)
    pub system_prompt: String,

    /// User messages (one rendered request per generation)
    pub messages: Vec<Message>,

    /// Max tokens for response (capped by config)
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Single-turn request: one system prompt and one user message
    pub fn single(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text of the first choice, `None` when the API returned no choices
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage for logging
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Convenience constructor for a plain text completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    EndTurn,
    MaxTokens,
    ContentFilter,
}

impl StopReason {
    /// Parse from an OpenAI `finish_reason`
    pub fn from_openai(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

//! LLM Client module
//!
//! Provides chat-completion requests against a hosted model.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Only "openai" (and OpenAI-compatible endpoints via `base-url`) is supported.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: openai",
                other
            )))
        }
    }
}

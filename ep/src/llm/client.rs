//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent (fresh context)
///
/// Every generation sends the full template and request; no conversation
/// state is kept between calls, so regenerating a metric never sees the
/// previous answer.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier, for logging and display
    fn model(&self) -> &str;
}

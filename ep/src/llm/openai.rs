//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI's Chat Completions API. Each call
//! is a single attempt; failures go straight back to the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// Fallback when a 429 carries no usable retry-after header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAIClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        messages.extend(request.messages.iter().map(|msg| {
            serde_json::json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            })
        }));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // o1/o3 and gpt-5 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choice_count = api_response.choices.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.choices.into_iter().next() {
            Some(choice) => (
                choice.message.content,
                StopReason::from_openai(choice.finish_reason.as_deref()),
            ),
            None => {
                debug!("parse_response: no choices");
                (None, StopReason::EndTurn)
            }
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        CompletionResponse {
            content,
            stop_reason,
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    debug!("complete: request timed out");
                    LlmError::Timeout(self.timeout)
                } else {
                    debug!(error = %e, "complete: network error");
                    LlmError::Network(e)
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            debug!("complete: rate limited (429)");
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let parsed = self.parse_response(api_response);
        info!(
            model = %self.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Completion received"
        );
        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
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
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

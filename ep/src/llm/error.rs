//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Missing API key: set the {0} environment variable or add it to the secrets file")]
    MissingApiKey(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Check if re-running the same request could succeed
    ///
    /// Nothing is retried automatically; this only shapes the hint shown to the user.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500 || *status == 408,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) | LlmError::MissingApiKey(_) | LlmError::Config(_) => false,
        }
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rate_limit() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert!(err.is_rate_limit());

        let err = LlmError::ApiError {
            status: 500,
            message: "Server error".to_string(),
        };
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_is_transient() {
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_transient()
        );

        // 4xx errors are not worth re-running unchanged
        assert!(
            !LlmError::ApiError {
                status: 401,
                message: "Invalid API key".to_string()
            }
            .is_transient()
        );

        assert!(LlmError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(!LlmError::MissingApiKey("OPENAI_API_KEY".to_string()).is_transient());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_transient());
    }

    #[test]
    fn test_retry_after() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }

    #[test]
    fn test_missing_api_key_message() {
        let err = LlmError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}

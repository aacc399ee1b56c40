//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during backend calls
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),
}

impl LlmError {
    /// Map a transport error, separating out timeouts
    pub fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Network(error)
        }
    }

    /// Whether the backend rejected the request itself (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, LlmError::ApiError { status, .. } if (400..500).contains(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = LlmError::ApiError {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "API error 403: forbidden");
        assert_eq!(
            LlmError::MissingApiKey("GEMINI_API_KEY".to_string()).to_string(),
            "Missing API key: GEMINI_API_KEY"
        );
    }

    #[test]
    fn test_is_client_error() {
        assert!(
            LlmError::ApiError {
                status: 400,
                message: "bad".to_string()
            }
            .is_client_error()
        );
        assert!(
            !LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_client_error()
        );
        assert!(!LlmError::Timeout(Duration::from_secs(1)).is_client_error());
    }
}

//! Error types for the LLM layer

use thiserror::Error;

/// Errors that can occur when resolving or calling an LLM provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Unknown provider name, or no credential in the environment
    #[error("Provider {0} not configured or available")]
    ProviderUnavailable(String),

    /// HTTP request failures
    #[error("HTTP error (status {status}): {body}")]
    HttpError { status: u16, body: String },

    /// SSE stream parsing failures
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error reported by the provider inside an otherwise successful response
    #[error("Provider error ({code}): {message}")]
    ProviderError { code: String, message: String },
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::HttpError {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            body: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_message() {
        let err = LlmError::ProviderUnavailable("gemini".to_string());
        assert_eq!(err.to_string(), "Provider gemini not configured or available");
    }

    #[test]
    fn test_http_error() {
        let err = LlmError::HttpError {
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }

    #[test]
    fn test_provider_error() {
        let err = LlmError::ProviderError {
            code: "context_length_exceeded".to_string(),
            message: "too long".to_string(),
        };
        assert!(err.to_string().contains("context_length_exceeded"));
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::SerializationError(_)));
    }
}

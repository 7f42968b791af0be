// crates/simon-core/src/llm/types.rs
//! Request and error types for LLM integration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A general-purpose completion request: system prompt + user prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::NotAvailable("no API key".into());
        assert_eq!(err.to_string(), "Provider not available: no API key");

        let err = LlmError::ApiError {
            status: 429,
            body: "rate limited".into(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_completion_request_serialize() {
        let req = CompletionRequest {
            system: "Summarize.".into(),
            prompt: "Fix the bug in main.rs".into(),
            model: "claude-haiku-4-5-20251001".into(),
            max_tokens: 200,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("Fix the bug"));
    }
}

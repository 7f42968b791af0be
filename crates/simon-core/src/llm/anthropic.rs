// crates/simon-core/src/llm/anthropic.rs
//! Anthropic Messages API provider.

use super::provider::LlmProvider;
use super::types::{CompletionRequest, LlmError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// LLM provider backed by the Anthropic Messages API.
pub struct AnthropicProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Override the API endpoint (tests point this at a local server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotAvailable("no API key configured".into()));
        }

        let body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        debug!(model = %request.model, "Anthropic completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| LlmError::ParseFailed(e.to_string()))?;
        extract_response_text(&value)
    }

    fn name(&self) -> &str {
        "anthropic-api"
    }
}

/// Pull the first text block out of a Messages API response.
fn extract_response_text(value: &serde_json::Value) -> Result<String, LlmError> {
    value
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        })
        .and_then(|b| b.get("text").and_then(|t| t.as_str()))
        .map(String::from)
        .ok_or_else(|| LlmError::ParseFailed("no text content in response".into()))
}

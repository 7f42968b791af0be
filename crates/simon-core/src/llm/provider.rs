// crates/simon-core/src/llm/provider.rs
//! LlmProvider trait defining the interface for LLM integrations.

use super::types::{CompletionRequest, LlmError};
use async_trait::async_trait;

/// Trait for LLM providers that can run completions.
///
/// Implementations:
/// - `AnthropicProvider` — Anthropic Messages API over HTTPS
/// - test doubles in handler tests
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a completion and return the response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Provider name for logging (e.g. "anthropic-api").
    fn name(&self) -> &str;
}

// crates/simon-core/src/llm/mod.rs
//! LLM capability for summarization and skill generation.
//!
//! Every caller treats the provider as best-effort: a deterministic fallback
//! must exist wherever a completion is requested. The provider trait keeps
//! handler logic testable without network access.

pub mod anthropic;
pub mod provider;
pub mod types;

use crate::settings::Settings;
use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use provider::LlmProvider;
pub use types::{CompletionRequest, LlmError};

/// Build the configured provider, or None when no API key is set.
pub fn provider_from_settings(settings: &Settings) -> Option<Arc<dyn LlmProvider>> {
    if settings.anthropic.api_key.trim().is_empty() {
        return None;
    }
    Some(Arc::new(AnthropicProvider::new(
        settings.anthropic.api_key.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_api_key_no_provider() {
        let settings = Settings::default();
        assert!(provider_from_settings(&settings).is_none());
    }

    #[test]
    fn test_api_key_builds_provider() {
        let mut settings = Settings::default();
        settings.anthropic.api_key = "sk-test".into();
        let provider = provider_from_settings(&settings).unwrap();
        assert_eq!(provider.name(), "anthropic-api");
    }
}

//! Adapter from an `edgequake-llm` provider to [`SummaryBackend`].
//!
//! The provider abstraction hides HTTP status codes behind its own error
//! type, so overloads cannot be told apart here: every failure surfaces as
//! [`SummaryError::Backend`] with the provider's message.

use super::{Completion, SummaryBackend};
use crate::error::SummaryError;
use crate::pipeline::llm::SummaryRequest;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// [`SummaryBackend`] backed by any [`LLMProvider`].
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl ProviderBackend {
    /// Wrap a provider the caller already configured.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            label: "edgequake-llm".to_string(),
        }
    }

    /// Instantiate a named provider (`"openai"`, `"gemini"`, `"ollama"`, …)
    /// through [`ProviderFactory`]. Credentials come from the provider's own
    /// environment variables.
    pub fn from_name(name: &str, model: &str) -> Result<Self, SummaryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SummaryError::Validation("provider name is empty".into()));
        }
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            SummaryError::InvalidConfig(format!("provider '{name}' is not available: {e}"))
        })?;
        Ok(Self {
            provider,
            label: name.to_string(),
        })
    }
}

fn build_messages(request: &SummaryRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(&request.system_prompt),
        ChatMessage::user(request.user_message()),
    ]
}

fn build_options(request: &SummaryRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

#[async_trait]
impl SummaryBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &SummaryRequest) -> Result<Completion, SummaryError> {
        let messages = build_messages(request);
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| SummaryError::Backend {
                status: None,
                message: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
            stop_reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_request() {
        let config = crate::SummaryConfig::builder()
            .max_tokens(1234)
            .temperature(0.7)
            .build()
            .unwrap();
        let req = SummaryRequest::new(crate::DetailLevel::Detailed, "x", &config);
        let opts = build_options(&req);
        assert_eq!(opts.max_tokens, Some(1234));
        assert_eq!(opts.temperature, Some(0.7));
    }

    #[test]
    fn blank_provider_name_rejected() {
        let err = ProviderBackend::from_name("  ", "gpt-4o").unwrap_err();
        assert!(matches!(err, SummaryError::Validation(_)));
    }

    #[test]
    fn messages_are_system_then_user() {
        let config = crate::SummaryConfig::default();
        let req = SummaryRequest::new(crate::DetailLevel::Concise, "body", &config);
        assert_eq!(build_messages(&req).len(), 2);
    }
}

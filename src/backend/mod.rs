//! Generative text backends.
//!
//! [`SummaryBackend`] is the seam between the pipeline and whatever service
//! produces the summary. Two implementations ship with the crate:
//!
//! - [`anthropic::AnthropicBackend`]: speaks the Messages API wire contract
//!   directly, so HTTP status codes (notably 529 "overloaded") reach the
//!   classifier intact.
//! - [`provider::ProviderBackend`]: wraps any `edgequake-llm` provider
//!   (OpenAI, Gemini, Ollama, …) for users who prefer another model family.
//!
//! Backends never retry. A failed call is reported once and the user decides
//! whether to try again.

pub mod anthropic;
pub mod provider;
pub mod sse;

use crate::error::SummaryError;
use crate::pipeline::llm::SummaryRequest;
use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

pub use anthropic::AnthropicBackend;
pub use provider::ProviderBackend;

/// A lazy, finite, non-restartable sequence of text chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, SummaryError>> + Send>>;

/// A finished backend completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Raw text exactly as the backend produced it.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Backend-reported stop reason (`end_turn`, `max_tokens`, …), if any.
    pub stop_reason: Option<String>,
}

/// A service that turns a [`SummaryRequest`] into text.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Short provider label used in logs and error messages.
    fn name(&self) -> &str;

    /// Issue one request and wait for the full completion.
    async fn complete(&self, request: &SummaryRequest) -> Result<Completion, SummaryError>;

    /// Issue one request and yield text as it is generated.
    ///
    /// The default implementation waits for [`complete`](Self::complete) and
    /// yields the whole text as a single chunk.
    async fn stream(&self, request: &SummaryRequest) -> Result<ChunkStream, SummaryError> {
        let completion = self.complete(request).await?;
        Ok(Box::pin(stream::once(async move { Ok(completion.text) })))
    }

    /// Check that the credential is accepted by the backend.
    async fn verify(&self, model: &str) -> Result<(), SummaryError> {
        let _ = model;
        Ok(())
    }
}

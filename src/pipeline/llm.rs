//! Backend interaction: build the summary request and issue it once.
//!
//! All wording lives in [`crate::prompts`]; this module only assembles the
//! request from a [`DetailLevel`], the bounded text and the config, then
//! classifies the outcome.
//!
//! ## No retries
//!
//! Each call is a single request. Overloads and other failures are returned
//! to the caller, who decides whether to try again.

use crate::backend::{ChunkStream, Completion, SummaryBackend};
use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::prompts::{self, DetailLevel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One backend request. Built fresh for every call and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub system_prompt: String,
    pub instructions: String,
    pub source_text: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub detail_level: DetailLevel,
}

impl SummaryRequest {
    pub fn new(detail_level: DetailLevel, source_text: &str, config: &SummaryConfig) -> Self {
        Self {
            system_prompt: detail_level.system_prompt().to_string(),
            instructions: detail_level.instructions().to_string(),
            source_text: source_text.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            detail_level,
        }
    }

    /// The user-role message: instructions, then the document text.
    pub fn user_message(&self) -> String {
        prompts::user_message(&self.instructions, &self.source_text)
    }
}

/// Thin wrapper that owns the backend and enforces the completion rules.
#[derive(Clone)]
pub struct SummaryClient {
    backend: Arc<dyn SummaryBackend>,
}

impl std::fmt::Debug for SummaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryClient")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl SummaryClient {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Issue `request` and wait for the full text.
    ///
    /// An empty (or whitespace-only) completion is a
    /// [`SummaryError::Backend`], never a successful empty summary.
    pub async fn summarize(&self, request: &SummaryRequest) -> Result<Completion, SummaryError> {
        let start = Instant::now();
        info!(
            "Requesting {} summary from '{}' ({} chars of source)",
            request.detail_level,
            self.backend.name(),
            request.source_text.chars().count()
        );

        let completion = self.backend.complete(request).await.inspect_err(|e| {
            warn!("Backend '{}' failed: {}", self.backend.name(), e);
        })?;

        if completion.text.trim().is_empty() {
            warn!("Backend '{}' returned an empty completion", self.backend.name());
            return Err(SummaryError::Backend {
                status: None,
                message: "backend returned an empty completion".into(),
            });
        }

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            completion.input_tokens,
            completion.output_tokens,
            start.elapsed()
        );
        Ok(completion)
    }

    /// Issue `request` and return the chunk stream. Emptiness can only be
    /// judged once the stream is drained.
    pub async fn summarize_stream(
        &self,
        request: &SummaryRequest,
    ) -> Result<ChunkStream, SummaryError> {
        info!(
            "Streaming {} summary from '{}'",
            request.detail_level,
            self.backend.name()
        );
        self.backend.stream(request).await.inspect_err(|e| {
            warn!("Backend '{}' failed: {}", self.backend.name(), e);
        })
    }

    /// Minimal request confirming that the credential is accepted.
    pub async fn verify(&self, model: &str) -> Result<(), SummaryError> {
        self.backend.verify(model).await
    }
}

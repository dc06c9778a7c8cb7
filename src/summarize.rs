//! Summarize actions: the orchestrator that ties the stages together.
//!
//! ```text
//! Idle ─▶ Ingesting ─▶ Bounding ─▶ Requesting ─▶ Sanitizing ─▶ Done
//!   │         │           │            │
//!   └─────────┴───────────┴────────────┴──▶ Failed{stage, reason}
//! ```
//!
//! [`SummaryPipeline::summarize`] runs the whole chain for a new document.
//! [`SummaryPipeline::resummarize`] enters at `Requesting` with the text
//! stored in the [`Session`], which is how "summarize again" and "more
//! detail" avoid fetching and parsing the document a second time.
//!
//! Every action, successful or not, leaves its [`SummaryResult`] in the
//! session. The bounded text is stored as soon as bounding finishes, so a
//! backend failure never forces the user to re-upload.

use crate::backend::{AnthropicBackend, ProviderBackend, SummaryBackend};
use crate::config::SummaryConfig;
use crate::error::{PipelineError, Stage, SummaryError};
use crate::pipeline::bound::{bound_text, ExtractedText};
use crate::pipeline::extract::{has_pdf_magic, PdfiumExtractor, TextExtractor};
use crate::pipeline::input::{Document, FetchedPayload, RemoteFetcher, SummaryInput};
use crate::pipeline::llm::{SummaryClient, SummaryRequest};
use crate::pipeline::postprocess::sanitize;
use crate::progress::{NoopObserver, PipelineObserver, SharedObserver};
use crate::prompts::DetailLevel;
use crate::session::{Session, SessionState};
use crate::stream::SummaryStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a summarize action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryStatus {
    Success,
    Failure { stage: Stage, reason: String },
}

/// What one summarize action produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub detail_level: DetailLevel,
    /// Completion exactly as the backend returned it (empty on failure).
    pub raw_response: String,
    /// `sanitize(raw_response)`.
    pub cleaned_text: String,
    pub status: SummaryStatus,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Wall-clock time of the whole action.
    pub duration_ms: u64,
}

impl SummaryResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, SummaryStatus::Success)
    }
}

/// Milliseconds in `elapsed`, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Record a finished action in `state` and notify the observer.
pub(crate) fn record_success(
    state: &mut SessionState,
    observer: &dyn PipelineObserver,
    detail_level: DetailLevel,
    raw_response: String,
    tokens: (usize, usize),
    started: Instant,
) -> SummaryResult {
    observer.on_stage(Stage::Sanitizing);
    let cleaned_text = sanitize(&raw_response);
    debug!(
        "Sanitized {} → {} chars",
        raw_response.chars().count(),
        cleaned_text.chars().count()
    );

    let result = SummaryResult {
        detail_level,
        raw_response,
        cleaned_text,
        status: SummaryStatus::Success,
        input_tokens: tokens.0,
        output_tokens: tokens.1,
        duration_ms: elapsed_ms(started.elapsed()),
    };

    info!(
        "{} summary done in {}ms ({} output tokens)",
        detail_level, result.duration_ms, result.output_tokens
    );

    state.last_result = Some(result.clone());
    observer.on_stage(Stage::Done);
    observer.on_complete(&result);
    result
}

/// Record a failed action in `state`, notify the observer and return the
/// error to hand back to the caller.
pub(crate) fn record_failure(
    state: &mut SessionState,
    observer: &dyn PipelineObserver,
    detail_level: DetailLevel,
    stage: Stage,
    source: SummaryError,
    started: Instant,
) -> PipelineError {
    let error = PipelineError::new(stage, source);
    warn!("{}", error);

    state.last_result = Some(SummaryResult {
        detail_level,
        raw_response: String::new(),
        cleaned_text: String::new(),
        status: SummaryStatus::Failure {
            stage,
            reason: error.source.to_string(),
        },
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: elapsed_ms(started.elapsed()),
    });
    observer.on_failed(&error);
    error
}

/// Pick the backend, from most-specific to least-specific:
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name`), instantiated through
///    edgequake-llm with `config.model`.
/// 3. **Anthropic** with `config.api_key`.
///
/// None of the three → [`SummaryError::Validation`].
pub fn resolve_backend(config: &SummaryConfig) -> Result<Arc<dyn SummaryBackend>, SummaryError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        return Ok(Arc::new(ProviderBackend::from_name(name, &config.model)?));
    }

    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(Arc::new(AnthropicBackend::new(
            key,
            &config.api_base_url,
            config.api_timeout_secs,
        )?)),
        _ => Err(SummaryError::Validation(
            "no API key configured; enter a valid API key".into(),
        )),
    }
}

/// Runs summarize actions against a [`Session`].
///
/// Cheap to share: wrap it in an `Arc` and serve many sessions from it.
pub struct SummaryPipeline {
    config: SummaryConfig,
    client: SummaryClient,
    fetcher: RemoteFetcher,
    extractor: Arc<dyn TextExtractor>,
    observer: SharedObserver,
}

impl std::fmt::Debug for SummaryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryPipeline")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl SummaryPipeline {
    /// Build a pipeline. Fails when no backend can be resolved (see
    /// [`resolve_backend`]).
    pub fn new(config: SummaryConfig) -> Result<Self, SummaryError> {
        let backend = resolve_backend(&config)?;
        let fetcher = RemoteFetcher::new(config.fetch_timeout_secs, &config.user_agent)?;
        let extractor = config
            .extractor
            .clone()
            .unwrap_or_else(|| Arc::new(PdfiumExtractor::new()));
        let observer = config
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopObserver));

        info!("Summary pipeline ready (backend '{}')", backend.name());

        Ok(Self {
            client: SummaryClient::new(backend),
            fetcher,
            extractor,
            observer,
            config,
        })
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Confirm the backend accepts the configured credential.
    pub async fn verify_credential(&self) -> Result<(), SummaryError> {
        info!("Verifying credential with '{}'", self.client.backend_name());
        self.client.verify(&self.config.model).await
    }

    /// Turn a document into plain text (before bounding).
    ///
    /// Text that is empty or whitespace-only is an
    /// [`SummaryError::Extraction`].
    pub async fn ingest(&self, document: Document) -> Result<String, SummaryError> {
        let text = match document {
            Document::Upload { name, bytes } => {
                info!("Extracting text from upload '{}' ({} bytes)", name, bytes.len());
                self.extract_pdf(bytes).await?
            }
            Document::Remote { url } => match self.fetcher.fetch(&url).await? {
                FetchedPayload::Pdf(bytes) => self.extract_pdf(bytes).await?,
                FetchedPayload::Text(text) => text,
            },
        };

        if text.trim().is_empty() {
            return Err(SummaryError::Extraction {
                detail: "document has no extractable text".into(),
            });
        }
        debug!("Ingested {} chars", text.chars().count());
        Ok(text)
    }

    async fn extract_pdf(&self, bytes: Vec<u8>) -> Result<String, SummaryError> {
        if !has_pdf_magic(&bytes) {
            return Err(SummaryError::Extraction {
                detail: "input is not a PDF (missing %PDF header)".into(),
            });
        }
        self.extractor.extract(bytes).await
    }

    /// Ingest and bound `input`, storing the bounded text in `state`.
    async fn prepare(
        &self,
        state: &mut SessionState,
        input: SummaryInput,
        detail_level: DetailLevel,
        started: Instant,
    ) -> Result<ExtractedText, PipelineError> {
        let observer = self.observer.as_ref();

        let document = match input.into_document() {
            Ok(doc) => doc,
            Err(e) => {
                return Err(record_failure(
                    state, observer, detail_level, Stage::Idle, e, started,
                ))
            }
        };

        observer.on_stage(Stage::Ingesting);
        let text = match self.ingest(document).await {
            Ok(text) => text,
            Err(e) => {
                return Err(record_failure(
                    state,
                    observer,
                    detail_level,
                    Stage::Ingesting,
                    e,
                    started,
                ))
            }
        };

        observer.on_stage(Stage::Bounding);
        let extracted = bound_text(&text, self.config.max_input_chars);
        if extracted.truncated {
            observer.on_truncated(extracted.original_length, self.config.max_input_chars);
        }
        state.extracted = Some(extracted.clone());
        Ok(extracted)
    }

    /// Text stored by an earlier action, or the failed state.
    fn stored_text(
        &self,
        state: &mut SessionState,
        detail_level: DetailLevel,
        started: Instant,
    ) -> Result<ExtractedText, PipelineError> {
        match state.extracted.clone() {
            Some(extracted) => Ok(extracted),
            None => Err(record_failure(
                state,
                self.observer.as_ref(),
                detail_level,
                Stage::Idle,
                SummaryError::Validation("summarize a paper first".into()),
                started,
            )),
        }
    }

    async fn request(
        &self,
        state: &mut SessionState,
        extracted: &ExtractedText,
        detail_level: DetailLevel,
        started: Instant,
    ) -> Result<SummaryResult, PipelineError> {
        let observer = self.observer.as_ref();
        observer.on_stage(Stage::Requesting);

        let request = SummaryRequest::new(detail_level, &extracted.content, &self.config);
        match self.client.summarize(&request).await {
            Ok(completion) => Ok(record_success(
                state,
                observer,
                detail_level,
                completion.text,
                (completion.input_tokens, completion.output_tokens),
                started,
            )),
            Err(e) => Err(record_failure(
                state,
                observer,
                detail_level,
                Stage::Requesting,
                e,
                started,
            )),
        }
    }

    /// Summarize a new document.
    ///
    /// The upload is used when both an upload and a URL are supplied.
    /// Neither → `Failed{Idle}` with [`SummaryError::Validation`].
    pub async fn summarize(
        &self,
        session: &Session,
        input: SummaryInput,
        detail_level: DetailLevel,
    ) -> Result<SummaryResult, PipelineError> {
        let mut state = session.lock().await;
        let started = Instant::now();

        let extracted = self.prepare(&mut state, input, detail_level, started).await?;
        self.request(&mut state, &extracted, detail_level, started).await
    }

    /// Summarize the text stored in `session` again, e.g. at another detail
    /// level. Never fetches or extracts.
    pub async fn resummarize(
        &self,
        session: &Session,
        detail_level: DetailLevel,
    ) -> Result<SummaryResult, PipelineError> {
        let mut state = session.lock().await;
        let started = Instant::now();

        let extracted = self.stored_text(&mut state, detail_level, started)?;
        self.request(&mut state, &extracted, detail_level, started).await
    }

    /// Like [`summarize`](Self::summarize), but the backend output arrives
    /// as a [`SummaryStream`]. The session stays locked until the stream is
    /// finished or dropped.
    pub async fn summarize_stream(
        &self,
        session: &Session,
        input: SummaryInput,
        detail_level: DetailLevel,
    ) -> Result<SummaryStream, PipelineError> {
        let mut state = session.lock_owned().await;
        let started = Instant::now();

        let extracted = self.prepare(&mut state, input, detail_level, started).await?;
        self.open_stream(state, &extracted, detail_level, started).await
    }

    /// Streaming variant of [`resummarize`](Self::resummarize).
    pub async fn resummarize_stream(
        &self,
        session: &Session,
        detail_level: DetailLevel,
    ) -> Result<SummaryStream, PipelineError> {
        let mut state = session.lock_owned().await;
        let started = Instant::now();

        let extracted = self.stored_text(&mut state, detail_level, started)?;
        self.open_stream(state, &extracted, detail_level, started).await
    }

    async fn open_stream(
        &self,
        mut state: tokio::sync::OwnedMutexGuard<SessionState>,
        extracted: &ExtractedText,
        detail_level: DetailLevel,
        started: Instant,
    ) -> Result<SummaryStream, PipelineError> {
        self.observer.on_stage(Stage::Requesting);

        let request = SummaryRequest::new(detail_level, &extracted.content, &self.config);
        match self.client.summarize_stream(&request).await {
            Ok(chunks) => Ok(SummaryStream::new(
                chunks,
                state,
                Arc::clone(&self.observer),
                detail_level,
                started,
            )),
            Err(e) => Err(record_failure(
                &mut state,
                self.observer.as_ref(),
                detail_level,
                Stage::Requesting,
                e,
                started,
            )),
        }
    }
}

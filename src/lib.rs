//! # edgequake-paper-summary
//!
//! Summarise research papers (an uploaded PDF or a URL) into a structured
//! Korean-language markdown digest with a generative LLM backend.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes / URL
//!  │
//!  ├─ 1. Ingest    fetch the URL, extract PDF text via pdfium (spawn_blocking)
//!  ├─ 2. Bound     keep the first 100 000 characters
//!  ├─ 3. Request   one backend call under the fixed instruction contract
//!  ├─ 4. Sanitize  strip wrapper tags, preambles, escaped newlines
//!  └─ 5. Store     bounded text + result kept in the session for re-use
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paper_summary::{
//!     DetailLevel, Session, SummaryConfig, SummaryInput, SummaryPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummaryConfig::builder().api_key("sk-ant-...").build()?;
//!     let pipeline = SummaryPipeline::new(config)?;
//!     let session = Session::new();
//!
//!     let input = SummaryInput::url("https://arxiv.org/pdf/2401.00001");
//!     let concise = pipeline.summarize(&session, input, DetailLevel::Concise).await?;
//!     println!("{}", concise.cleaned_text);
//!
//!     // Same paper, more detail: no second download or PDF parse.
//!     let detailed = pipeline.resummarize(&session, DetailLevel::Detailed).await?;
//!     println!("{}", detailed.cleaned_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `papersum` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-paper-summary = { version = "0.1", default-features = false }
//! ```
//!
//! ## Backends
//!
//! | Backend | Selected by | Notes |
//! |---------|-------------|-------|
//! | Anthropic Messages API | `api_key` | default; distinguishes overload (529) from other failures |
//! | any edgequake-llm provider | `provider_name` | OpenAI, Gemini, Ollama, …; credentials from the provider's env vars |
//! | custom | `backend` | any `Arc<dyn SummaryBackend>` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod stream;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{AnthropicBackend, ChunkStream, Completion, ProviderBackend, SummaryBackend};
pub use config::{SummaryConfig, SummaryConfigBuilder};
pub use error::{FetchFailure, PipelineError, Stage, SummaryError};
pub use export::{export_result, export_text, ExportFormat};
pub use pipeline::bound::{bound_text, ExtractedText};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::input::{Document, RemoteFetcher, SummaryInput};
pub use pipeline::llm::{SummaryClient, SummaryRequest};
pub use pipeline::postprocess::sanitize;
pub use progress::{NoopObserver, PipelineObserver};
pub use prompts::DetailLevel;
pub use session::{Session, SessionState};
pub use stream::SummaryStream;
pub use summarize::{resolve_backend, SummaryPipeline, SummaryResult, SummaryStatus};

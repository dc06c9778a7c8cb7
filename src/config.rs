//! Configuration types for paper summarization.
//!
//! All pipeline behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`]. The builder validates numeric bounds once,
//! so the pipeline itself never has to re-check them.
//!
//! The API credential lives here only for the lifetime of the process: it is
//! redacted from `Debug` output and never serialised or written to disk.

use crate::backend::SummaryBackend;
use crate::error::SummaryError;
use crate::pipeline::extract::TextExtractor;
use crate::progress::PipelineObserver;
use std::fmt;
use std::sync::Arc;

/// Default backend model.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Default Anthropic API origin.
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

/// Browser-like identification header. Many publishers reject requests that
/// carry no user agent or a library default one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for the summarization pipeline.
///
/// Built via [`SummaryConfig::builder()`] or using [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_paper_summary::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .api_key("sk-ant-...")
///     .max_input_chars(50_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 4000);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Anthropic API credential. Supplied per session; never persisted.
    pub api_key: Option<String>,

    /// Backend model identifier. Default: `claude-3-5-sonnet-20240620`.
    pub model: String,

    /// Maximum tokens the backend may generate. Default: 4000.
    ///
    /// Shared by both detail levels; the detailed prompt asks for more lines
    /// per section, not a bigger budget.
    pub max_tokens: usize,

    /// Sampling temperature. Range 0.0–1.0. Default: 0.3.
    pub temperature: f32,

    /// Maximum characters of document text sent to the backend. Default: 100 000.
    pub max_input_chars: usize,

    /// Timeout for URL downloads in seconds. Default: 10.
    pub fetch_timeout_secs: u64,

    /// Timeout for a single backend call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Origin of the Messages API. Default: `https://api.anthropic.com`.
    pub api_base_url: String,

    /// `User-Agent` sent when fetching documents.
    pub user_agent: String,

    /// Name of an edgequake-llm provider (e.g. "openai", "gemini") to use
    /// instead of the built-in Anthropic backend.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn SummaryBackend>>,

    /// Text extractor for PDF payloads. Default: pdfium.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Receives stage transitions, truncation warnings and chunks.
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            max_input_chars: 100_000,
            fetch_timeout_secs: 10,
            api_timeout_secs: 120,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            provider_name: None,
            backend: None,
            extractor: None,
            observer: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_input_chars", &self.max_input_chars)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        let c = &self.config;
        if c.max_input_chars == 0 {
            return Err(SummaryError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(SummaryError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.fetch_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(SummaryError::InvalidConfig(
                "timeouts must be at least one second".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(SummaryError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(SummaryError::InvalidConfig(format!(
                "api_base_url must be an HTTP(S) URL, got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

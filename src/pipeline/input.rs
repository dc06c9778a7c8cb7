//! Input resolution: turn what the user supplied into a fetched payload.
//!
//! A summarize action receives at most one upload and at most one URL.
//! The upload wins when both are present. A URL is fetched once with a
//! browser-like `User-Agent` and a fixed timeout; the response is then
//! routed by content type (and by the `%PDF` signature, since many servers
//! label PDFs `application/octet-stream`).

use crate::error::{FetchFailure, SummaryError};
use crate::pipeline::extract::has_pdf_magic;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// A document as supplied by the user. Discarded once its text is extracted.
#[derive(Clone, PartialEq, Eq)]
pub enum Document {
    /// PDF bytes uploaded directly.
    Upload { name: String, bytes: Vec<u8> },
    /// A remote resource to fetch.
    Remote { url: String },
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Upload { name, bytes } => f
                .debug_struct("Upload")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            Document::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
        }
    }
}

/// Body of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedPayload {
    /// PDF bytes, to be run through the text extractor.
    Pdf(Vec<u8>),
    /// Already-textual content (HTML, plain text, …), used as-is.
    Text(String),
}

/// The inputs of one summarize action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryInput {
    pub upload: Option<(String, Vec<u8>)>,
    pub url: Option<String>,
}

impl SummaryInput {
    /// Input consisting of one uploaded PDF.
    pub fn upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            upload: Some((name.into(), bytes)),
            url: None,
        }
    }

    /// Input consisting of one URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            upload: None,
            url: Some(url.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Pick the document to ingest. Upload beats URL; a blank URL counts as
    /// absent; only `http://` and `https://` URLs are accepted.
    pub fn into_document(self) -> Result<Document, SummaryError> {
        if let Some((name, bytes)) = self.upload {
            return Ok(Document::Upload { name, bytes });
        }

        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                if !is_url(url) {
                    return Err(SummaryError::Validation(format!(
                        "'{url}' is not an http(s) URL"
                    )));
                }
                Ok(Document::Remote {
                    url: url.to_string(),
                })
            }
            _ => Err(SummaryError::Validation(
                "upload a PDF or enter a URL".into(),
            )),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// `true` for content types whose body is text in some charset.
fn is_textual(content_type: &str) -> bool {
    if content_type.contains("application/pdf") {
        return false;
    }
    content_type.starts_with("text/")
        || content_type.contains("charset=")
        || ["html", "xml", "json"].iter().any(|t| content_type.contains(t))
}

/// HTTP client for remote documents.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl RemoteFetcher {
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, SummaryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| SummaryError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// GET `url` once. Never retries.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPayload, SummaryError> {
        info!("Fetching document from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.failure(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Fetch {
                url: url.to_string(),
                failure: FetchFailure::Status(status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        debug!("Fetched '{}' with content-type '{}'", url, content_type);

        if is_textual(&content_type) {
            // Decoded with the declared charset, UTF-8 when none is given.
            let text = response.text().await.map_err(|e| self.failure(url, &e))?;
            return Ok(FetchedPayload::Text(text));
        }

        let body = response.bytes().await.map_err(|e| self.failure(url, &e))?;
        debug!("Fetched {} bytes", body.len());

        if content_type.contains("application/pdf") || has_pdf_magic(&body) {
            Ok(FetchedPayload::Pdf(body.to_vec()))
        } else {
            Ok(FetchedPayload::Text(String::from_utf8_lossy(&body).into_owned()))
        }
    }

    fn failure(&self, url: &str, e: &reqwest::Error) -> SummaryError {
        let failure = if e.is_timeout() {
            FetchFailure::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FetchFailure::Network(e.to_string())
        };
        SummaryError::Fetch {
            url: url.to_string(),
            failure,
        }
    }
}

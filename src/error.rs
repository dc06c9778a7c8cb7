//! Error types for the edgequake-paper-summary library.
//!
//! Two layers reflect where a failure is observed:
//!
//! * [`SummaryError`]: **What** went wrong: a closed taxonomy (bad input,
//!   unreadable PDF, failed download, overloaded or failing backend, …)
//!   carrying structured fields so callers can branch on them instead of
//!   matching message substrings.
//!
//! * [`PipelineError`]: **Where** it went wrong: the [`Stage`] of the
//!   summarize action that failed, plus the underlying [`SummaryError`].
//!   This is the `Failed{stage, reason}` state of the pipeline.
//!
//! No error aborts the session: every variant is returned as a value and the
//! caller may retry with an explicit new action.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a remote document could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchFailure {
    /// Server answered with a status outside 200–299.
    Status(u16),
    /// No response arrived within the configured timeout.
    Timeout { secs: u64 },
    /// DNS, connection reset, TLS or any other transport failure.
    Network(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Status(code) => write!(f, "HTTP status {code}"),
            FetchFailure::Timeout { secs } => write!(f, "timed out after {secs}s"),
            FetchFailure::Network(detail) => write!(f, "network error: {detail}"),
        }
    }
}

/// All errors returned by the edgequake-paper-summary library.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SummaryError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No input supplied, bad URL, missing credential, or nothing to
    /// re-summarize yet.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The bytes are not a PDF, or pdfium could not parse them.
    #[error("Could not extract text from PDF: {detail}")]
    Extraction { detail: String },

    /// URL retrieval failed.
    #[error("Failed to fetch '{url}': {failure}")]
    Fetch { url: String, failure: FetchFailure },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The backend reported a capacity problem (HTTP 529 / `overloaded_error`).
    ///
    /// Transient: the user should retry manually a little later.
    #[error("Backend '{provider}' is overloaded; try again shortly")]
    BackendOverload { provider: String },

    /// Any other backend-reported failure, message passed through as-is.
    #[error("Backend error{}: {message}", http_suffix(.status))]
    Backend {
        status: Option<u16>,
        message: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not write an exported summary.
    #[error("Failed to export summary to '{path}': {detail}")]
    Export { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl SummaryError {
    /// `true` for [`SummaryError::BackendOverload`].
    pub fn is_overload(&self) -> bool {
        matches!(self, SummaryError::BackendOverload { .. })
    }

    /// HTTP status attached to the error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SummaryError::Fetch {
                failure: FetchFailure::Status(code),
                ..
            } => Some(*code),
            SummaryError::Backend { status, .. } => *status,
            SummaryError::BackendOverload { .. } => Some(529),
            _ => None,
        }
    }
}

/// Stages of a single summarize action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Ingesting,
    Bounding,
    Requesting,
    Sanitizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Ingesting => "ingesting",
            Stage::Bounding => "bounding",
            Stage::Requesting => "requesting",
            Stage::Sanitizing => "sanitizing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A summarize action that ended in the `Failed{stage, reason}` state.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Summarization failed while {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: SummaryError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: SummaryError) -> Self {
        Self { stage, source }
    }

    /// A short, user-actionable follow-up for the presentation shell.
    pub fn user_hint(&self) -> &'static str {
        match &self.source {
            SummaryError::BackendOverload { .. } => {
                "The summarization service is handling many requests right now. Please try again in a moment."
            }
            SummaryError::Fetch { .. } => {
                "The PDF could not be downloaded directly. Download it and upload the file instead, or use a publicly accessible URL."
            }
            SummaryError::Extraction { .. } => {
                "The document has no extractable text. Scanned or encrypted PDFs are not supported."
            }
            SummaryError::Validation(_) | SummaryError::InvalidConfig(_) => {
                "Upload a PDF or enter a valid URL, and make sure a valid API key is set."
            }
            _ => "An unexpected error occurred. If the problem persists, contact the administrator.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_status_display() {
        let e = SummaryError::Fetch {
            url: "https://example.org/a.pdf".into(),
            failure: FetchFailure::Status(503),
        };
        let msg = e.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("example.org"), "got: {msg}");
        assert_eq!(e.status_code(), Some(503));
    }

    #[test]
    fn fetch_timeout_display() {
        let e = SummaryError::Fetch {
            url: "https://slow.example".into(),
            failure: FetchFailure::Timeout { secs: 10 },
        };
        assert!(e.to_string().contains("10s"));
        assert_eq!(e.status_code(), None);
    }

    #[test]
    fn backend_display_with_and_without_status() {
        let with = SummaryError::Backend {
            status: Some(400),
            message: "prompt is too long".into(),
        };
        assert_eq!(with.to_string(), "Backend error (HTTP 400): prompt is too long");

        let without = SummaryError::Backend {
            status: None,
            message: "connection reset".into(),
        };
        assert_eq!(without.to_string(), "Backend error: connection reset");
    }

    #[test]
    fn overload_is_distinguished() {
        let overload = SummaryError::BackendOverload {
            provider: "anthropic".into(),
        };
        let generic = SummaryError::Backend {
            status: Some(500),
            message: "internal".into(),
        };
        assert!(overload.is_overload());
        assert!(!generic.is_overload());
        assert!(overload.to_string().contains("anthropic"));
    }

    #[test]
    fn hints_differ_by_cause() {
        let overload = PipelineError::new(
            Stage::Requesting,
            SummaryError::BackendOverload {
                provider: "anthropic".into(),
            },
        );
        let generic = PipelineError::new(
            Stage::Requesting,
            SummaryError::Backend {
                status: Some(500),
                message: "boom".into(),
            },
        );
        assert_ne!(overload.user_hint(), generic.user_hint());
        assert!(overload.to_string().contains("requesting"));
    }
}

//! Direct client for the Anthropic Messages API.
//!
//! The wire contract is fixed by the provider:
//!
//! ```text
//! POST {base}/v1/messages
//! x-api-key: …            anthropic-version: 2023-06-01
//! { model, max_tokens, temperature, system, messages: [{role: "user", content}] }
//! ```
//!
//! A successful response carries `content[].text` and `usage`. Failures
//! carry `{"type":"error","error":{"type": …, "message": …}}`; HTTP 529 or an
//! `overloaded_error` type is reported as [`SummaryError::BackendOverload`],
//! everything else as [`SummaryError::Backend`] with the provider's message.

use super::sse::{SseEvent, SseParser};
use super::{ChunkStream, Completion, SummaryBackend};
use crate::error::SummaryError;
use crate::pipeline::llm::SummaryRequest;
use crate::prompts::CREDENTIAL_PROBE;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";
const OVERLOADED_STATUS: u16 = 529;

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

// ── Backend ──────────────────────────────────────────────────────────────────

/// [`SummaryBackend`] over the Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout_secs: u64,
}

impl fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl AnthropicBackend {
    /// Create a backend for `base_url` (e.g. `https://api.anthropic.com`).
    ///
    /// Fails with [`SummaryError::Validation`] when the key is blank.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, SummaryError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SummaryError::Validation("API key is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SummaryError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            timeout_secs,
        })
    }

    async fn post(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response, SummaryError> {
        debug!(
            "POST {} model={} max_tokens={} stream={}",
            self.endpoint, body.model, body.max_tokens, body.stream
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let err = classify_error(status.as_u16(), &text);
        warn!("Backend rejected request: {}", err);
        Err(err)
    }

    fn transport_error(&self, e: &reqwest::Error) -> SummaryError {
        let message = if e.is_timeout() {
            format!("request timed out after {}s", self.timeout_secs)
        } else {
            format!("request failed: {e}")
        };
        SummaryError::Backend {
            status: None,
            message,
        }
    }
}

fn wire_request(request: &SummaryRequest, stream: bool) -> MessagesRequest<'_> {
    MessagesRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: Some(request.temperature),
        system: Some(&request.system_prompt),
        messages: vec![WireMessage {
            role: "user",
            content: request.user_message(),
        }],
        stream,
    }
}

/// Map a non-2xx response to the error taxonomy.
pub(crate) fn classify_error(status: u16, body: &str) -> SummaryError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let kind = parsed.as_ref().map(|p| p.error.kind.as_str()).unwrap_or("");

    if status == OVERLOADED_STATUS || kind == "overloaded_error" {
        return SummaryError::BackendOverload {
            provider: PROVIDER.to_string(),
        };
    }

    let message = match parsed {
        Some(p) if !p.error.message.is_empty() => p.error.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_string(),
    };

    SummaryError::Backend {
        status: Some(status),
        message,
    }
}

fn classify_stream_error(kind: &str, message: &str) -> SummaryError {
    if kind == "overloaded_error" {
        SummaryError::BackendOverload {
            provider: PROVIDER.to_string(),
        }
    } else {
        SummaryError::Backend {
            status: None,
            message: if message.is_empty() {
                kind.to_string()
            } else {
                message.to_string()
            },
        }
    }
}

#[async_trait]
impl SummaryBackend for AnthropicBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &SummaryRequest) -> Result<Completion, SummaryError> {
        let response = self.post(&wire_request(request, false)).await?;
        let body: MessagesResponse = response.json().await.map_err(|e| SummaryError::Backend {
            status: None,
            message: format!("unreadable response: {e}"),
        })?;

        let text: String = body
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();

        info!(
            "Backend answered: {} input tokens, {} output tokens, stop={:?}",
            body.usage.input_tokens, body.usage.output_tokens, body.stop_reason
        );

        Ok(Completion {
            text,
            input_tokens: body.usage.input_tokens,
            output_tokens: body.usage.output_tokens,
            stop_reason: body.stop_reason,
        })
    }

    async fn stream(&self, request: &SummaryRequest) -> Result<ChunkStream, SummaryError> {
        let response = self.post(&wire_request(request, true)).await?;
        let body: ByteStream = Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec())));
        Ok(sse_chunks(body))
    }

    async fn verify(&self, model: &str) -> Result<(), SummaryError> {
        let probe = MessagesRequest {
            model,
            max_tokens: 10,
            temperature: None,
            system: None,
            messages: vec![WireMessage {
                role: "user",
                content: CREDENTIAL_PROBE.to_string(),
            }],
            stream: false,
        };
        self.post(&probe).await.map(|_| ())
    }
}

// ── Streaming ────────────────────────────────────────────────────────────────

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

struct SseState {
    body: ByteStream,
    parser: SseParser,
    pending: VecDeque<Result<String, SummaryError>>,
    finished: bool,
}

/// Turn a raw SSE body into text chunks. The stream ends after
/// `message_stop` or right after the first error. A body that closes before
/// `message_stop` ends with an error.
pub(crate) fn sse_chunks(body: ByteStream) -> ChunkStream {
    let state = SseState {
        body,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.finished = true;
                    st.pending.clear();
                }
                return Some((item, st));
            }
            if st.finished {
                return None;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for event in st.parser.feed(&bytes) {
                        match event {
                            SseEvent::TextDelta(text) if !text.is_empty() => {
                                st.pending.push_back(Ok(text));
                            }
                            SseEvent::TextDelta(_) => {}
                            SseEvent::Stop => {
                                st.finished = true;
                                break;
                            }
                            SseEvent::Error { kind, message } => {
                                st.pending
                                    .push_back(Err(classify_stream_error(&kind, &message)));
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => st.pending.push_back(Err(SummaryError::Backend {
                    status: None,
                    message: format!("stream interrupted: {e}"),
                })),
                None => {
                    warn!("Stream closed before message_stop");
                    st.pending.push_back(Err(SummaryError::Backend {
                        status: None,
                        message: "stream ended before message_stop".into(),
                    }));
                }
            }
        }
    }))
}

//! Shared helpers for integration tests: a throwaway HTTP responder and
//! counting fakes for the extractor and the backend.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_paper_summary::{
    Completion, SummaryBackend, SummaryError, SummaryRequest, TextExtractor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// The canned answer served for every request.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    /// Value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Minimal HTTP/1.1 server on 127.0.0.1 that answers every request with the
/// same [`Reply`] and records what it received.
pub struct MockServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockServer {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (h, r) = (Arc::clone(&hits), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let (reply, hits, requests) = (reply.clone(), Arc::clone(&h), Arc::clone(&r));
                tokio::spawn(async move {
                    let mut socket = socket;
                    if let Some(captured) = read_request(&mut socket).await {
                        // Count before answering.
                        hits.fetch_add(1, Ordering::SeqCst);
                        requests.lock().unwrap().push(captured);
                        write_reply(&mut socket, &reply).await;
                    }
                });
            }
        });

        Self {
            url: format!("http://{addr}"),
            hits,
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Captured> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse().ok())
        .unwrap_or(0)
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let want = header_end + 4 + content_length(&head);
    while buf.len() < want {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end + 4..]).into_owned();
    Some(Captured { head, body })
}

async fn write_reply(socket: &mut TcpStream, reply: &Reply) {
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let response_head = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reply.content_type,
        reply.body.len()
    );
    let _ = socket.write_all(response_head.as_bytes()).await;
    let _ = socket.write_all(&reply.body).await;
    let _ = socket.shutdown().await;
}

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Extractor returning fixed text and counting its calls.
pub struct CountingExtractor {
    pub text: String,
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for CountingExtractor {
    async fn extract(&self, _bytes: Vec<u8>) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Backend answering `## <source text>` and remembering the requests.
#[derive(Default)]
pub struct RecordingBackend {
    pub requests: Mutex<Vec<SummaryRequest>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<SummaryRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SummaryBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &SummaryRequest) -> Result<Completion, SummaryError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Completion {
            text: format!("<summary>## {}</summary>", request.source_text),
            input_tokens: 1,
            output_tokens: 1,
            stop_reason: None,
        })
    }
}

/// Backend that takes a while to answer and records the highest number of
/// calls it ever had running at once.
#[derive(Default)]
pub struct SlowBackend {
    pub delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, request: &SummaryRequest) -> Result<Completion, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Completion {
            text: format!("## {}", request.source_text),
            input_tokens: 1,
            output_tokens: 1,
            stop_reason: None,
        })
    }
}

/// Body of a successful Messages API response.
pub fn messages_ok(text: &str) -> Vec<u8> {
    serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20240620",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 1200, "output_tokens": 340}
    })
    .to_string()
    .into_bytes()
}

/// Body of a Messages API error response.
pub fn messages_error(kind: &str, message: &str) -> Vec<u8> {
    serde_json::json!({
        "type": "error",
        "error": {"type": kind, "message": message}
    })
    .to_string()
    .into_bytes()
}

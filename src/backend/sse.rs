//! Server-sent events parser for the Messages API streaming format.
//!
//! Handles frames split across TCP chunks, several frames in one read, and
//! multi-byte UTF-8 sequences cut in half by a chunk boundary (bytes are
//! buffered until a whole frame is available, then decoded).

use serde_json::Value;

/// Events the pipeline cares about. Everything else (`ping`,
/// `message_start`, `content_block_start`, …) is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Text appended to the current content block.
    TextDelta(String),
    /// `message_stop`: the completion is finished.
    Stop,
    /// In-band error, e.g. `overloaded_error` after the stream has started.
    Error { kind: String, message: String },
}

/// Stateful parser; feed it raw body bytes as they arrive.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
        let mut events = Vec::new();

        while let Some(end) = find_boundary(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&frame[..end]);
            if let Some(event) = parse_frame(&text) {
                events.push(event);
            }
        }

        events
    }
}

fn find_boundary(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(frame: &str) -> Option<SseEvent> {
    let data: Vec<&str> = frame
        .lines()
        .filter(|l| !l.starts_with(':'))
        .filter_map(|l| l.strip_prefix("data:"))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();

    if data.is_empty() {
        return None;
    }

    let json: Value = serde_json::from_str(&data.join("\n")).ok()?;
    match json.get("type").and_then(Value::as_str)? {
        "content_block_delta" => {
            let delta = json.get("delta")?;
            if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
                return None;
            }
            let text = delta.get("text").and_then(Value::as_str).unwrap_or("");
            Some(SseEvent::TextDelta(text.to_string()))
        }
        "message_stop" => Some(SseEvent::Stop),
        "error" => {
            let error = json.get("error");
            let field = |name: &str| {
                error
                    .and_then(|e| e.get(name))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            Some(SseEvent::Error {
                kind: field("type"),
                message: field("message"),
            })
        }
        _ => None,
    }
}

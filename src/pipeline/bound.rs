//! Character budget for the text sent to the backend.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Document text after bounding. The only document state kept in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// At most `max_input_chars` characters.
    pub content: String,
    /// `true` when the source was longer than the budget.
    pub truncated: bool,
    /// Length of the source in characters, before bounding.
    pub original_length: usize,
}

/// Keep the first `max_len` characters of `text`.
///
/// Counts Unicode scalar values, not bytes, so a cut never splits a
/// character.
pub fn bound_text(text: &str, max_len: usize) -> ExtractedText {
    let original_length = text.chars().count();
    if original_length <= max_len {
        return ExtractedText {
            content: text.to_string(),
            truncated: false,
            original_length,
        };
    }

    let cut = text
        .char_indices()
        .nth(max_len)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    warn!(
        "Document text truncated from {} to {} characters",
        original_length, max_len
    );

    ExtractedText {
        content: text[..cut].to_string(),
        truncated: true,
        original_length,
    }
}

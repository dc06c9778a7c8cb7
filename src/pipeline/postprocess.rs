//! Post-processing: deterministic cleanup of a raw backend completion.
//!
//! ## Why is post-processing necessary?
//!
//! Even a well-prompted model sometimes adds artefacts the prompt asked it
//! not to:
//!
//! - wrapping the answer in `<summary>` … `</summary>` tags
//! - opening with "Here is a summary of the research paper in Korean:"
//! - returning JSON-escaped `\n` sequences instead of real line breaks
//! - wrapping everything in a ` ```markdown ` fence
//! - emitting zero-width characters or a BOM
//!
//! The rules below remove these without touching the content. Each rule is a
//! pure `&str → String` function and independently testable.
//!
//! ## Idempotence
//!
//! [`sanitize`] repeats the rule pass until the text stops changing, so
//! `sanitize(sanitize(x)) == sanitize(x)` for every input. Every rule either
//! shortens the text or leaves it as is (the lone `\r → \n` rewrite keeps the
//! length but cannot fire twice), so the loop always ends.

use once_cell::sync::Lazy;
use regex::Regex;

/// Turn a raw completion into the canonical display string.
///
/// Rules (applied in order, repeated to a fixpoint):
/// 1. Remove `<summary>` / `</summary>` wrapper tags
/// 2. Normalise line endings (CRLF → LF)
/// 3. Turn escaped `\n` sequences into real newlines (LaTeX commands kept)
/// 4. Strip an outer markdown fence
/// 5. Strip a boilerplate preamble line (case-insensitive)
/// 6. Trim trailing whitespace per line
/// 7. Collapse 3+ consecutive blank lines down to 2
/// 8. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 9. Trim leading and trailing whitespace
pub fn sanitize(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_once(input: &str) -> String {
    let s = remove_summary_tags(input);
    let s = normalise_line_endings(&s);
    let s = unescape_newlines(&s);
    let s = strip_markdown_fences(&s);
    let s = strip_preamble(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Wrapper tags ─────────────────────────────────────────────────────

static RE_SUMMARY_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?summary\s*>").unwrap());

fn remove_summary_tags(input: &str) -> String {
    RE_SUMMARY_TAGS.replace_all(input, "").into_owned()
}

// ── Rule 2: Line endings ─────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Escaped newlines ─────────────────────────────────────────────────

// A `\n` followed by a lowercase ASCII letter is left alone: that is LaTeX
// (`\neq`, `\nu`, `\nabla`), not an escaped line break.
fn unescape_newlines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                // Keep `\\` pairs intact.
                out.push(c);
                out.push('\\');
                chars.next();
            }
            Some('n') => {
                chars.next();
                if chars.peek().is_some_and(|next| next.is_ascii_lowercase()) {
                    out.push_str("\\n");
                } else {
                    out.push('\n');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

// ── Rule 4: Outer fence ──────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

// Only a single fence around the whole text is stripped; text holding its
// own code blocks is left as is.
fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) if !caps[1].lines().any(|l| l.trim_start().starts_with("```")) => {
            caps[1].to_string()
        }
        _ => input.to_string(),
    }
}

// ── Rule 5: Boilerplate preamble ─────────────────────────────────────────────
//
// Matches "Here is a summary of the research paper in Korean:" and the
// detailed-mode "Here is a more detailed summary of …", only at the start.

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\A\s*here is (?:a |the )?(?:more )?(?:detailed )?summary of (?:the|this) research paper(?: in korean)?\s*:\s*",
    )
    .unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").into_owned()
}

// ── Rule 6: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Blank lines ──────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").into_owned()
}

// ── Rule 8: Invisible characters ─────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

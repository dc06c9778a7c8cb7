//! Pipeline stages for paper summarization.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ bound ──▶ llm ──▶ postprocess
//! (upload/URL) (pdfium)  (chars)  (backend) (cleanup)
//! ```
//!
//! 1. [`input`]  : turn an upload or a URL into a fetched payload
//! 2. [`extract`]: PDF bytes to plain text; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`bound`]  : cap the text at the configured character budget
//! 4. [`llm`]    : one backend call under the fixed instruction contract;
//!    the only stage that talks to the summarization service
//! 5. [`postprocess`]: deterministic cleanup of the raw completion

pub mod bound;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;

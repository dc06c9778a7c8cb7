//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-heavy parsing. The work is moved to the blocking pool
//! so Tokio worker threads never stall on a large document.
//!
//! ## Binding
//!
//! The native library is located from `PDFIUM_LIB_PATH` (a file or the
//! directory holding it) and otherwise from the system library path. A
//! missing library is an [`SummaryError::Extraction`], not a panic.
//!
//! Each blocking-pool thread binds pdfium once and reuses the binding for
//! later documents; a failed bind is retried on the next call.

use crate::error::SummaryError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// `true` when `bytes` start with the PDF signature.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Turns PDF bytes into the concatenated text of its pages.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Vec<u8>) -> Result<String, SummaryError>;
}

/// Join per-page text in page order. Pages with no text contribute nothing;
/// no separator is inserted between pages.
pub fn join_page_texts<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages.into_iter().fold(String::new(), |mut acc, page| {
        acc.push_str(page.as_ref());
        acc
    })
}

/// Default [`TextExtractor`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to the pdfium library at `path` instead of searching for it.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, bytes: Vec<u8>) -> Result<String, SummaryError> {
        if !has_pdf_magic(&bytes) {
            return Err(SummaryError::Extraction {
                detail: "input is not a PDF (missing %PDF header)".into(),
            });
        }

        let library_path = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        tokio::task::spawn_blocking(move || extract_blocking(&bytes, library_path))
            .await
            .map_err(|e| SummaryError::Internal(format!("Extraction task panicked: {e}")))?
    }
}

fn bind(library_path: Option<PathBuf>) -> Result<Pdfium, SummaryError> {
    let bindings = match library_path {
        Some(path) => {
            let path = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| SummaryError::Extraction {
        detail: format!("pdfium library unavailable: {e:?}"),
    })?;

    Ok(Pdfium::new(bindings))
}

thread_local! {
    static BOUND: RefCell<Option<(Option<PathBuf>, Rc<Pdfium>)>> = const { RefCell::new(None) };
}

/// The pdfium binding of the current thread, created on first use.
fn pdfium_for(library_path: Option<PathBuf>) -> Result<Rc<Pdfium>, SummaryError> {
    BOUND.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some((path, pdfium)) = slot.as_ref() {
            if *path == library_path {
                return Ok(Rc::clone(pdfium));
            }
        }
        let pdfium = Rc::new(bind(library_path.clone())?);
        *slot = Some((library_path, Rc::clone(&pdfium)));
        Ok(pdfium)
    })
}

fn extract_blocking(bytes: &[u8], library_path: Option<PathBuf>) -> Result<String, SummaryError> {
    let pdfium = pdfium_for(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| SummaryError::Extraction {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let texts = pages.iter().enumerate().map(|(idx, page)| match page.text() {
        Ok(text) => text.all(),
        Err(e) => {
            debug!("Page {}: no text layer ({:?})", idx + 1, e);
            String::new()
        }
    });

    Ok(join_page_texts(texts))
}

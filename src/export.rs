//! Export a cleaned summary as plain text or as a Word document.
//!
//! The `.docx` package is the smallest one Word accepts: content types,
//! package relationships and a `document.xml` holding one paragraph equal to
//! the summary, with each newline rendered as a line break.
//!
//! Files are written through a [`tempfile::NamedTempFile`] in the target
//! directory and renamed into place, so a crash never leaves a half-written
//! export behind.

use crate::error::SummaryError;
use crate::summarize::SummaryResult;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Text,
    Docx,
}

impl ExportFormat {
    /// Infer the format from a file extension (`.txt`, `.md`, `.docx`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" | "markdown" => Some(ExportFormat::Text),
            "docx" => Some(ExportFormat::Docx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Docx => "docx",
        }
    }
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 forbids most control characters.
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

/// `word/document.xml` for a single paragraph.
fn document_xml(text: &str) -> String {
    let runs = text
        .split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape_xml(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>");

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r>{runs}</w:r></w:p></w:body></w:document>"#
    )
}

/// Build a `.docx` package in memory.
pub fn docx_bytes(text: &str) -> Result<Vec<u8>, SummaryError> {
    let zip_err = |e: &dyn std::fmt::Display| SummaryError::Internal(format!("docx: {e}"));
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        ("word/document.xml", document_xml(text)),
    ];
    for (name, body) in parts {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options).map_err(|e| zip_err(&e))?;
        zip.write_all(body.as_bytes()).map_err(|e| zip_err(&e))?;
    }

    let cursor = zip.finish().map_err(|e| zip_err(&e))?;
    Ok(cursor.into_inner())
}

/// Default file name offered for a result, e.g. `detailed_summary.docx`.
pub fn default_file_name(result: &SummaryResult, format: ExportFormat) -> String {
    let stem = match result.detail_level {
        crate::DetailLevel::Concise => "summary",
        crate::DetailLevel::Detailed => "detailed_summary",
    };
    format!("{stem}.{}", format.extension())
}

/// Write `text` to `path` in `format`, atomically.
pub async fn export_text(
    text: &str,
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<PathBuf, SummaryError> {
    let path = path.as_ref();
    let io_err = |e: std::io::Error| SummaryError::Export {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let bytes = match format {
        ExportFormat::Text => text.as_bytes().to_vec(),
        ExportFormat::Docx => docx_bytes(text)?,
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;

    // The temp file lives next to the target so the rename stays on one
    // filesystem.
    let target = path.to_path_buf();
    let len = bytes.len();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| SummaryError::Internal(format!("export task panicked: {e}")))?
    .map_err(io_err)?;

    info!("Exported {} bytes to {}", len, path.display());
    Ok(path.to_path_buf())
}

/// Export the cleaned text of a successful result. The format follows the
/// file extension and defaults to plain text.
pub async fn export_result(
    result: &SummaryResult,
    path: impl AsRef<Path>,
) -> Result<PathBuf, SummaryError> {
    let path = path.as_ref();
    if !result.is_success() {
        return Err(SummaryError::Export {
            path: path.to_path_buf(),
            detail: "the last summarize action failed; nothing to export".into(),
        });
    }
    let format = ExportFormat::from_path(path).unwrap_or(ExportFormat::Text);
    export_text(&result.cleaned_text, path, format).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::summarize::SummaryStatus;
    use crate::DetailLevel;
    use std::io::Read;

    fn result(text: &str, status: SummaryStatus) -> SummaryResult {
        SummaryResult {
            detail_level: DetailLevel::Detailed,
            raw_response: text.into(),
            cleaned_text: text.into(),
            status,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut out = String::new();
        part.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.TXT")), Some(ExportFormat::Text));
        assert_eq!(ExportFormat::from_path(Path::new("a.docx")), Some(ExportFormat::Docx));
        assert_eq!(ExportFormat::from_path(Path::new("a.pdf")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn docx_has_one_paragraph_with_line_breaks() {
        let bytes = docx_bytes("## Title\n- a & b <c>").unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert_eq!(xml.matches("<w:p>").count(), 1);
        assert!(xml.contains("## Title</w:t><w:br/><w:t"));
        assert!(xml.contains("- a &amp; b &lt;c&gt;"));
        assert!(read_part(&bytes, "[Content_Types].xml").contains("/word/document.xml"));
        assert!(read_part(&bytes, "_rels/.rels").contains("officeDocument"));
    }

    #[test]
    fn docx_keeps_korean_text() {
        let bytes = docx_bytes("요약임").unwrap();
        assert!(read_part(&bytes, "word/document.xml").contains("요약임"));
    }

    #[test]
    fn default_names() {
        let r = result("x", SummaryStatus::Success);
        assert_eq!(default_file_name(&r, ExportFormat::Docx), "detailed_summary.docx");
    }

    #[tokio::test]
    async fn text_export_is_atomic_and_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/summary.txt");
        let written = export_result(&result("## T\n요약", SummaryStatus::Success), &path)
            .await
            .unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "## T\n요약");
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file left behind");
    }

    #[tokio::test]
    async fn failed_result_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let failed = result(
            "",
            SummaryStatus::Failure {
                stage: Stage::Requesting,
                reason: "overloaded".into(),
            },
        );
        let err = export_result(&failed, dir.path().join("s.txt")).await.unwrap_err();
        assert!(matches!(err, SummaryError::Export { .. }));
    }
}

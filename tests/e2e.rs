//! End-to-end tests against the live Anthropic API.
//!
//! They need a real credential and a pdfium library, so they are gated
//! behind `E2E_ENABLED` and skip silently otherwise.
//!
//! Run with:
//!   E2E_ENABLED=1 ANTHROPIC_API_KEY=sk-ant-... cargo test --test e2e -- --nocapture
//!
//! Optional:
//!   E2E_PAPER_URL   paper to fetch (default: an arXiv PDF)
//!   E2E_PAPER_PDF   local PDF to upload (default: test_cases/paper.pdf)

use edgequake_paper_summary::{
    export_result, DetailLevel, Session, SummaryConfig, SummaryInput, SummaryPipeline,
};
use std::path::PathBuf;

const DEFAULT_PAPER_URL: &str = "https://arxiv.org/pdf/1706.03762";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgequake_paper_summary=info".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Skip unless `E2E_ENABLED` and a credential are both set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                println!("SKIP: ANTHROPIC_API_KEY is not set");
                return;
            }
        }
    }};
}

/// Checks every real summary must pass.
fn assert_summary_quality(text: &str, context: &str) {
    assert!(!text.trim().is_empty(), "[{context}] summary is empty");
    assert!(!text.contains("<summary>"), "[{context}] wrapper tag survived");
    assert!(!text.contains("\\n"), "[{context}] escaped newline survived");
    assert!(
        !text.to_lowercase().starts_with("here is"),
        "[{context}] preamble survived: {:?}",
        text.lines().next()
    );
    assert!(text.contains("##"), "[{context}] no markdown headers");
    assert!(
        text.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c)),
        "[{context}] no Hangul in output"
    );
}

#[tokio::test]
async fn test_url_then_detailed() {
    let key = e2e_skip_unless_ready!();
    init_tracing();

    let url = std::env::var("E2E_PAPER_URL").unwrap_or_else(|_| DEFAULT_PAPER_URL.into());
    let pipeline =
        SummaryPipeline::new(SummaryConfig::builder().api_key(key).build().unwrap()).unwrap();
    pipeline.verify_credential().await.unwrap();

    let session = Session::new();
    let concise = pipeline
        .summarize(&session, SummaryInput::url(&url), DetailLevel::Concise)
        .await
        .unwrap();
    assert_summary_quality(&concise.cleaned_text, "concise");
    println!("concise: {} chars", concise.cleaned_text.chars().count());

    let detailed = pipeline
        .resummarize(&session, DetailLevel::Detailed)
        .await
        .unwrap();
    assert_summary_quality(&detailed.cleaned_text, "detailed");
    println!("detailed: {} chars", detailed.cleaned_text.chars().count());

    let dir = tempfile::tempdir().unwrap();
    let docx = export_result(&detailed, dir.path().join("detailed_summary.docx"))
        .await
        .unwrap();
    assert!(std::fs::metadata(docx).unwrap().len() > 0);
}

#[tokio::test]
async fn test_local_upload() {
    let key = e2e_skip_unless_ready!();
    init_tracing();

    let path = std::env::var("E2E_PAPER_PDF")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/paper.pdf"));
    if !path.exists() {
        println!("SKIP: test file not found: {}", path.display());
        return;
    }

    let bytes = std::fs::read(&path).unwrap();
    let pipeline =
        SummaryPipeline::new(SummaryConfig::builder().api_key(key).build().unwrap()).unwrap();
    let result = pipeline
        .summarize(
            &Session::new(),
            SummaryInput::upload(path.display().to_string(), bytes),
            DetailLevel::Concise,
        )
        .await
        .unwrap();
    assert_summary_quality(&result.cleaned_text, "upload");
    assert!(result.input_tokens > 0);
}

//! CLI binary for edgequake-paper-summary.
//!
//! A thin shell over the library crate: maps flags to `SummaryConfig`,
//! shows a spinner while the pipeline runs and prints the cleaned summary.
//! With `--interactive` the same session can be re-summarized (for example
//! in more detail) or exported without downloading or parsing the paper
//! again.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use edgequake_paper_summary::pipeline::input::is_url;
use edgequake_paper_summary::{
    export_result, DetailLevel, PipelineError, PipelineObserver, Session, Stage, SummaryConfig,
    SummaryInput, SummaryPipeline, SummaryResult,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Spinner observer using indicatif ─────────────────────────────────────────

/// Shows the current stage on a spinner and reports truncation inline.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Summarizing");
        Arc::new(Self { bar })
    }
}

impl PipelineObserver for SpinnerObserver {
    fn on_stage(&self, stage: Stage) {
        let msg = match stage {
            Stage::Ingesting => "reading the paper…",
            Stage::Bounding => "preparing text…",
            Stage::Requesting => "waiting for the model…",
            Stage::Sanitizing => "cleaning up…",
            Stage::Idle | Stage::Done => return,
        };
        // Ingesting opens a new action; so does Requesting after a finished one.
        if stage == Stage::Ingesting || self.bar.is_finished() {
            self.bar.reset();
            self.bar.enable_steady_tick(Duration::from_millis(80));
        }
        self.bar.set_message(msg);
    }

    fn on_truncated(&self, original_len: usize, max_len: usize) {
        self.bar.println(format!(
            "  {} Text is long ({original_len} chars); only the first {max_len} are used",
            cyan("⚠"),
        ));
    }

    fn on_failed(&self, _error: &PipelineError) {
        self.bar.finish_and_clear();
    }

    fn on_complete(&self, _result: &SummaryResult) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a local PDF (prompts for the API key)
  papersum paper.pdf

  # Summarise from a URL, in detail, and save as Word
  papersum --detailed https://arxiv.org/pdf/1706.03762 -o attention.docx

  # Stream the answer as it is written
  papersum --stream paper.pdf

  # Keep the session open: re-summarize, switch detail level, export
  papersum --interactive paper.pdf

  # Use another provider through edgequake-llm
  papersum --provider openai --model gpt-4.1 paper.pdf

INTERACTIVE COMMANDS:
  again | a          summarize the same paper again
  detailed | d       summarize again in more detail
  concise | c        summarize again, concise
  export <path>      save the last summary (.txt, .md or .docx)
  quit | q           leave

ENVIRONMENT VARIABLES:
  PAPERSUM_MODEL      Override model ID
  PAPERSUM_PROVIDER   Use an edgequake-llm provider instead of Anthropic
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  RUST_LOG            Log filter, e.g. edgequake_paper_summary=debug
"#;

/// Summarise research papers with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "papersum",
    version,
    about = "Summarise research papers (PDF or URL) into structured Korean markdown",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Also export the summary to this file (.txt, .md or .docx).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ask for the detailed summary (≈10 bulleted lines per section).
    #[arg(short, long)]
    detailed: bool,

    /// Anthropic API key. Prompted for when omitted.
    #[arg(long)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "PAPERSUM_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider (openai, gemini, ollama, …) instead of Anthropic.
    #[arg(long, env = "PAPERSUM_PROVIDER")]
    provider: Option<String>,

    /// Anthropic API origin.
    #[arg(long, env = "PAPERSUM_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Maximum characters of paper text sent to the model.
    #[arg(long, default_value_t = 100_000)]
    max_chars: usize,

    /// Maximum output tokens.
    #[arg(long, default_value_t = 4000)]
    max_tokens: usize,

    /// Sampling temperature (0.0–1.0).
    #[arg(long, default_value_t = 0.3)]
    temperature: f32,

    /// URL download timeout in seconds.
    #[arg(long, default_value_t = 10)]
    fetch_timeout: u64,

    /// Model call timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// Print the summary as it is generated.
    #[arg(long)]
    stream: bool,

    /// Output the structured result as JSON instead of markdown.
    #[arg(long, conflicts_with = "stream")]
    json: bool,

    /// Keep the session open for further commands.
    #[arg(short, long)]
    interactive: bool,

    /// Skip the credential check before summarizing.
    #[arg(long)]
    skip_verify: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the summary and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn detail_level(&self) -> DetailLevel {
        if self.detailed {
            DetailLevel::Detailed
        } else {
            DetailLevel::Concise
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already shows progress; library INFO logs would garble it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stream;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Input ────────────────────────────────────────────────────────────
    let input = read_input(&cli.input).await?;

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(SpinnerObserver::new);
    let config = build_config(&cli, spinner)?;
    let pipeline = SummaryPipeline::new(config).context("Failed to set up the pipeline")?;

    if !cli.skip_verify {
        pipeline
            .verify_credential()
            .await
            .context("The API key was rejected; check it and try again")?;
        if !cli.quiet {
            eprintln!("{} API key verified", green("✔"));
        }
    }

    // ── First summary ────────────────────────────────────────────────────
    let session = Session::new();
    let first = run(&pipeline, &session, &cli, Action::New(input), cli.detail_level()).await;

    match first {
        Ok(result) => {
            if let Some(ref path) = cli.output {
                export(&result, path, cli.quiet).await?;
            }
        }
        Err(e) => {
            report_failure(&e);
            // A backend failure keeps the text, so the session can retry.
            let retryable = session.extracted().await.is_some();
            if !(cli.interactive && retryable) {
                return Err(anyhow!(e).context("Summarization failed"));
            }
        }
    }

    if cli.interactive {
        interactive_loop(&pipeline, &session, &cli).await?;
    }

    Ok(())
}

async fn read_input(input: &str) -> Result<SummaryInput> {
    if is_url(input) {
        return Ok(SummaryInput::url(input));
    }

    let path = Path::new(input);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string());
    Ok(SummaryInput::upload(name, bytes))
}

fn build_config(cli: &Cli, observer: Option<Arc<SpinnerObserver>>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .max_input_chars(cli.max_chars)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .fetch_timeout_secs(cli.fetch_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url);
    }
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder = match (&cli.provider, &cli.api_key) {
        (Some(provider), _) => builder.provider_name(provider),
        (None, Some(key)) => builder.api_key(key),
        (None, None) => builder.api_key(prompt_api_key()?),
    };

    builder.build().context("Invalid configuration")
}

fn prompt_api_key() -> Result<String> {
    eprint!("{} ", bold("Anthropic API key:"));
    io::stderr().flush().ok();
    let mut key = String::new();
    io::stdin()
        .read_line(&mut key)
        .context("Failed to read the API key")?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(anyhow!("Enter a valid API key"));
    }
    Ok(key)
}

enum Action {
    New(SummaryInput),
    Again,
}

/// Run one summarize action and print its outcome.
async fn run(
    pipeline: &SummaryPipeline,
    session: &Session,
    cli: &Cli,
    action: Action,
    detail_level: DetailLevel,
) -> Result<SummaryResult, PipelineError> {
    let result = if cli.stream {
        let mut stream = match action {
            Action::New(input) => pipeline.summarize_stream(session, input, detail_level).await?,
            Action::Again => pipeline.resummarize_stream(session, detail_level).await?,
        };
        let mut stdout = io::stdout();
        while let Some(chunk) = stream.next().await {
            if let Ok(text) = chunk {
                print!("{text}");
                stdout.flush().ok();
            }
        }
        println!();
        stream.finish().await?
    } else {
        let result = match action {
            Action::New(input) => pipeline.summarize(session, input, detail_level).await?,
            Action::Again => pipeline.resummarize(session, detail_level).await?,
        };
        print_result(&result, cli.json);
        result
    };

    if !cli.quiet {
        eprintln!(
            "{} {} summary  {}ms  {}",
            green("✔"),
            result.detail_level,
            result.duration_ms,
            dim(&format!(
                "{} tokens in / {} tokens out",
                result.input_tokens, result.output_tokens
            )),
        );
    }
    Ok(result)
}

fn print_result(result: &SummaryResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("{} {e}", red("✘")),
        }
    } else {
        println!("{}", result.cleaned_text);
    }
}

fn report_failure(error: &PipelineError) {
    eprintln!("{} {}", red("✘"), error);
    eprintln!("  {}", dim(error.user_hint()));
}

async fn export(result: &SummaryResult, path: &Path, quiet: bool) -> Result<()> {
    let written = export_result(result, path)
        .await
        .context("Export failed")?;
    if !quiet {
        eprintln!("{} saved to {}", green("✔"), bold(&written.display().to_string()));
    }
    Ok(())
}

async fn interactive_loop(pipeline: &SummaryPipeline, session: &Session, cli: &Cli) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut level = cli.detail_level();

    loop {
        eprint!("{} ", cyan("papersum>"));
        io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read command")? else {
            return Ok(());
        };
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => continue,
            "q" | "quit" | "exit" => return Ok(()),
            "a" | "again" => {}
            "d" | "detailed" => level = DetailLevel::Detailed,
            "c" | "concise" => level = DetailLevel::Concise,
            "e" | "export" => {
                let path = arg.trim();
                if path.is_empty() {
                    eprintln!("{} usage: export <path>", red("✘"));
                    continue;
                }
                match session.last_result().await {
                    Some(result) => {
                        if let Err(e) = export(&result, Path::new(path), cli.quiet).await {
                            eprintln!("{} {e:#}", red("✘"));
                        }
                    }
                    None => eprintln!("{} summarize a paper first", red("✘")),
                }
                continue;
            }
            other => {
                eprintln!("{} unknown command '{other}' (again, detailed, concise, export, quit)", red("✘"));
                continue;
            }
        }

        if let Err(e) = run(pipeline, session, cli, Action::Again, level).await {
            report_failure(&e);
        }
    }
}

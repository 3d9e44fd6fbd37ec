//! CLI binary for pdf2transcript.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranscriptConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2transcript::{
    inspect, transcribe, transcribe_to_file, ExtractionMode, FailurePolicy, ProgressCallback,
    TranscriptConfig, TranscriptProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. Works correctly when pages complete out of order
/// (the scheduler makes no ordering promises).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_run_start` (called before any pages are corrected).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Correcting");
        self.bar.reset_eta();
    }
}

impl TranscriptProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        // Switch from spinner-only style to full progress bar now that the
        // extraction phase is done and the page count is known.
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Correcting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = truncate_message(error, 79);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages corrected successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages corrected  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

/// Truncate to at most `max_chars` characters plus an ellipsis.
///
/// Truncation happens on a character boundary; provider error messages
/// routinely carry accented text and slicing them by byte offset panics.
fn truncate_message(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic transcription (stdout)
  pdf2transcript libro_escaneado.pdf

  # Transcribe to file
  pdf2transcript libro_escaneado.pdf -o libro.txt

  # English document, lower concurrency for strict rate limits
  pdf2transcript --lang en -c 3 report.pdf -o report.txt

  # Force vision transcription for a low-quality scan
  pdf2transcript --mode vision scan.pdf -o scan.txt

  # Use a specific model
  pdf2transcript --model gpt-4o --provider openai document.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2transcript --inspect-only document.pdf

  # Keep per-page scratch files for debugging
  pdf2transcript --work-dir ./scratch book.pdf -o book.txt

  # JSON output with per-page results and stats
  pdf2transcript --json document.pdf > output.json

EXTRACTION MODES:
  auto    embedded text layer when present, else local OCR, else vision (default)
  local   always run local OCR, even when a text layer exists
  vision  always transcribe page images with the vision model

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium shared library

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Transcribe:      pdf2transcript document.pdf -o output.txt

  Local OCR needs Tesseract with the language's tessdata installed
  (e.g. apt install tesseract-ocr tesseract-ocr-spa). Without it, pages
  lacking a text layer fall back to vision transcription automatically.
"#;

/// Transcribe PDF documents to clean, corrected plain text.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2transcript",
    version,
    about = "Transcribe PDF documents to clean, corrected plain text",
    long_about = "Turn scanned or digital PDFs into clean plain-text transcripts. Raw text is \
extracted per page (embedded text layer, local OCR, or vision transcription), corrected by an \
LLM that sees neighboring pages as context, and reassembled in page order. Supports OpenAI, \
Anthropic, Google Gemini, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: String,

    /// Write the transcript to this file instead of stdout.
    #[arg(short, long, env = "PDF2TRANSCRIPT_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Rendering DPI for OCR and vision rasterisation (72–400).
    #[arg(long, env = "PDF2TRANSCRIPT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent correction calls.
    #[arg(short, long, env = "PDF2TRANSCRIPT_CONCURRENCY", default_value_t = 6)]
    concurrency: usize,

    /// OCR/document language (ISO code like "es", or a tessdata name).
    #[arg(long, env = "PDF2TRANSCRIPT_LANG", default_value = "es")]
    lang: String,

    /// Extraction mode: auto, local, vision.
    #[arg(long, env = "PDF2TRANSCRIPT_MODE", value_enum, default_value = "auto")]
    mode: ModeArg,

    /// Correction attempts per page before it is marked failed.
    #[arg(long, env = "PDF2TRANSCRIPT_MAX_RETRIES", default_value_t = 5)]
    max_retries: u32,

    /// Base retry delay in milliseconds (doubles per attempt).
    #[arg(long, env = "PDF2TRANSCRIPT_RETRY_DELAY_MS", default_value_t = 1500)]
    retry_base_delay_ms: u64,

    /// Jitter ceiling in milliseconds added to each retry delay.
    #[arg(long, env = "PDF2TRANSCRIPT_RETRY_JITTER_MS", default_value_t = 500)]
    retry_jitter_ms: u64,

    /// Stop admitting new pages after the first terminal failure.
    #[arg(long, env = "PDF2TRANSCRIPT_ABORT_ON_FAILURE")]
    abort_on_failure: bool,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2TRANSCRIPT_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2TRANSCRIPT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Directory for per-page raw/cleaned scratch files (kept after the run).
    #[arg(long, env = "PDF2TRANSCRIPT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Path to a text file containing a custom correction system prompt.
    #[arg(long, env = "PDF2TRANSCRIPT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Output structured JSON (TranscriptOutput) instead of plain text.
    #[arg(long, env = "PDF2TRANSCRIPT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2TRANSCRIPT_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no transcription.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TRANSCRIPT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TRANSCRIPT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Auto,
    Local,
    Vision,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Auto => ExtractionMode::Auto,
            ModeArg::Local => ExtractionMode::Local,
            ModeArg::Vision => ExtractionMode::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar starts as a spinner (extraction has no per-page
    // events); `on_run_start` resizes it once correction begins.
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn TranscriptProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run transcription ────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let output = transcribe_to_file(&cli.input, output_path, &config)
            .await
            .context("Transcription failed")?;

        if !cli.quiet {
            print_summary(&output, Some(output_path));
        }
    } else {
        let output = transcribe(&cli.input, &config)
            .await
            .context("Transcription failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.text.as_bytes())
                .context("Failed to write to stdout")?;
            // Ensure a trailing newline on stdout.
            if !output.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }

        if !cli.quiet && !cli.json {
            print_summary(&output, None);
        }
    }

    Ok(())
}

/// One-line run summary to stderr, enumerating failed pages if any.
fn print_summary(output: &pdf2transcript::TranscriptOutput, dest: Option<&PathBuf>) {
    let stats = &output.stats;
    let tick = if stats.failed_pages == 0 {
        green("✔")
    } else {
        cyan("⚠")
    };
    match dest {
        Some(path) => eprintln!(
            "{tick}  {}/{} pages  {}ms  →  {}",
            stats.corrected_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        ),
        None => eprintln!(
            "{tick}  {}/{} pages corrected in {}ms",
            stats.corrected_pages, stats.total_pages, stats.total_duration_ms,
        ),
    }

    let failed = output.failed_page_numbers();
    if !failed.is_empty() {
        let list = failed
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("   {} pages failed: {}", red(&failed.len().to_string()), list);
    }
    if stats.empty_pages > 0 {
        eprintln!("   {} pages had no extractable text", dim(&stats.empty_pages.to_string()));
    }
}

/// Map CLI args to `TranscriptConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranscriptConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = TranscriptConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .language(cli.lang.clone())
        .mode(cli.mode.clone().into())
        .max_retries(cli.max_retries)
        .retry_base_delay_ms(cli.retry_base_delay_ms)
        .retry_jitter_ms(cli.retry_jitter_ms)
        .max_output_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .failure_policy(if cli.abort_on_failure {
            FailurePolicy::AbortOnFirstFailure
        } else {
            FailurePolicy::CollectFailures
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

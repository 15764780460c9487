//! CLI binary for edgequake-ankify.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnkifyConfig`, runs the pipeline and writes the CSV.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ankify::pipeline::input::{detect_kind, load_text_units};
use edgequake_ankify::{
    ankify, export, AnkifyConfig, AnkifyProgressCallback, FailurePolicy, InputKind, PageSelection,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per unit.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us how many units there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} units  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Ankifying");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, unit_id: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&unit_id))
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl AnkifyProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating cards for {total_units} text unit(s)…"))
        ));
    }

    fn on_unit_start(&self, unit_id: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(unit_id, Instant::now());
        }
        self.bar.set_message(format!("unit {unit_id}"));
    }

    fn on_unit_summarized(&self, unit_id: usize, chunk_count: usize) {
        self.bar
            .set_message(format!("unit {unit_id}: summarised {chunk_count} chunks"));
    }

    fn on_unit_complete(&self, unit_id: usize, total: usize, card_count: usize) {
        let secs = self.elapsed_secs(unit_id);
        self.bar.println(format!(
            "  {} Unit {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            unit_id,
            total,
            dim(&format!("{card_count:>3} cards")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_error(&self, unit_id: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(unit_id);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Unit {:>3}/{:<3}  {}  {}",
            red("✗"),
            unit_id,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_units: usize, success_count: usize) {
        let failed = total_units.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} units processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} units processed  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_units,
                red(&failed.to_string()),
            );
        }
    }
}

impl Drop for CliProgressCallback {
    // a fail-fast run never reaches on_run_complete
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Five cards from a text file, written to output/<timestamp>.csv
  ankify notes.txt

  # Ten cards per page for pages 3-7 of a PDF, tagged for Anki
  ankify --pages 3-7 --cards 10 --tag biology chapter2.pdf

  # A web page (scheme optional with --type url)
  ankify --type url paulgraham.com/read.html

  # Explicit output file
  ankify notes.txt -o cards.csv

  # Keep cards from successful pages when some pages fail
  ankify --keep-partial --concurrency 4 book.pdf

  # Show the extracted text only (no API key needed)
  ankify --extract-only chapter2.pdf

IMPORTING INTO ANKI:
  File → Import, pick the CSV, field separator "Comma",
  map field 1 → Front, field 2 → Back, field 3 → Tags.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  RUST_LOG                Log filter, e.g. edgequake_ankify=debug
"#;

/// Generate Anki flashcards from text files, PDFs and web pages.
#[derive(Parser, Debug)]
#[command(
    name = "ankify",
    version,
    about = "Generate Anki flashcards from text files, PDFs and web pages using LLMs",
    long_about = "Read a text file, PDF or web page, summarise any part too large for one \
request, ask an LLM for question/answer cards and write them as an Anki-importable CSV. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file, PDF file or URL.
    input: String,

    /// How to read the input: auto, txt, pdf, url.
    #[arg(short = 't', long = "type", env = "ANKIFY_TYPE", value_enum, default_value = "auto")]
    input_type: InputTypeArg,

    /// PDF page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "ANKIFY_PAGES", default_value = "all")]
    pages: String,

    /// Cards to request per text unit (per page for PDFs).
    #[arg(short, long, env = "ANKIFY_CARDS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    cards: u32,

    /// Tag written on every card the model did not tag itself.
    #[arg(short = 'T', long, env = "ANKIFY_TAG")]
    tag: Option<String>,

    /// Directory for the timestamped CSV file.
    #[arg(long, env = "ANKIFY_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Write the CSV to this file instead of a timestamped one.
    #[arg(short, long, env = "ANKIFY_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Token budget of one request; larger units are summarised first.
    #[arg(long, env = "ANKIFY_MAX_TOKENS_PER_REQUEST", default_value_t = 2048)]
    max_tokens_per_request: usize,

    /// Hard token limit on the text sent for card generation.
    #[arg(long, env = "ANKIFY_GENERATION_CEILING", default_value_t = 4096)]
    generation_ceiling: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "ANKIFY_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "ANKIFY_MAX_OUTPUT_TOKENS", default_value_t = 2048)]
    max_output_tokens: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "ANKIFY_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ANKIFY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Text units processed concurrently (card order is unaffected).
    #[arg(long, env = "ANKIFY_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Keep cards from successful units when others fail.
    #[arg(long, env = "ANKIFY_KEEP_PARTIAL")]
    keep_partial: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "ANKIFY_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "ANKIFY_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the run output (cards, per-unit stats) as JSON instead of
    /// writing a CSV.
    #[arg(long, env = "ANKIFY_JSON")]
    json: bool,

    /// Print the extracted text units and exit; no model calls.
    #[arg(long)]
    extract_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "ANKIFY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ANKIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ANKIFY_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum InputTypeArg {
    Auto,
    Txt,
    Pdf,
    Url,
}

impl From<InputTypeArg> for InputKind {
    fn from(v: InputTypeArg) -> Self {
        match v {
            InputTypeArg::Auto => InputKind::Auto,
            InputTypeArg::Txt => InputKind::Text,
            InputTypeArg::Pdf => InputKind::Pdf,
            InputTypeArg::Url => InputKind::Url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are noise while the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.extract_only;
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

    let config = build_config(&cli).await?;

    // ── PDFium engine ────────────────────────────────────────────────────
    // Downloaded (~30 MB) on the first PDF input only, with a visible bar.
    let reads_pdf = match config.input_kind {
        InputKind::Auto => detect_kind(&cli.input) == InputKind::Pdf,
        kind => kind == InputKind::Pdf,
    };
    if reads_pdf && !pdfium_auto::is_pdfium_cached() {
        ensure_pdfium(cli.quiet)?;
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let units = load_text_units(&cli.input, &config)
            .await
            .context("Failed to read input")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&units).context("Failed to serialise text units")?
            );
        } else {
            for unit in &units {
                println!("{}", bold(&format!("── unit {} ──", unit.id)));
                println!("{}\n", unit.text);
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    // The bar starts only now so it never overlaps the pdfium download bar.
    let mut config = config;
    if show_progress {
        config.progress_callback =
            Some(CliProgressCallback::new_dynamic() as Arc<dyn AnkifyProgressCallback>);
    }

    let output = ankify(&cli.input, &config)
        .await
        .context("Card generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let path = match cli.output {
        Some(ref path) => {
            export::write_csv(&output.cards, path).await?;
            path.clone()
        }
        None => export::write_csv_in_dir(&output.cards, &cli.output_dir).await?,
    };

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} cards from {}/{} units  {}ms  →  {}",
            if stats.failed_units == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_cards,
            stats.processed_units,
            stats.total_units,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} model calls  /  {} tokens in  /  {} tokens out",
            dim(&stats.model_calls.to_string()),
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
        if stats.skipped_blocks > 0 {
            eprintln!(
                "   {} reply block(s) could not be parsed into cards",
                dim(&stats.skipped_blocks.to_string())
            );
        }
        for err in output.unit_errors() {
            eprintln!("   {} {}", red("✗"), err);
        }
    }

    Ok(())
}

/// Download pdfium if it is not cached yet.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `AnkifyConfig`.
async fn build_config(cli: &Cli) -> Result<AnkifyConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = AnkifyConfig::builder()
        .input_kind(cli.input_type.clone().into())
        .pages(pages)
        .card_count(cli.cards as usize)
        .max_tokens_per_request(cli.max_tokens_per_request)
        .generation_ceiling_tokens(cli.generation_ceiling)
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_output_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency)
        .failure_policy(if cli.keep_partial {
            FailurePolicy::CollectPartial
        } else {
            FailurePolicy::FailFast
        });

    if let Some(ref tag) = cli.tag {
        builder = builder.default_tag(tag.as_str());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.as_str());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

//! CLI binary for paper2notion.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig`, runs the pipeline and turns the outcome into an exit code.

use anyhow::{Context, Result};
use clap::Parser;
use paper2notion::config::DEFAULT_MODEL;
use paper2notion::prompts::SYSTEM_PROMPT;
use paper2notion::summarize::load_paper;
use paper2notion::{
    initialize_database, run_pipeline, summarize, Credentials, GeminiOracle, NotionClient,
    Paper2NotionError, PdfMode, PipelineOutcome, ProgressCallback, Round, SummaryConfig,
    SummaryMode, SummaryProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_GENERATION_FAILED: u8 = 2;
const EXIT_PUBLISH_FAILED: u8 = 3;

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per resolved section or failed attempt.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading paper…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_attempt_start(&self, round: &Round, attempt: u32, max_attempts: u32) {
        self.bar.set_prefix("Summarising");
        self.bar.set_message(format!("{round} ({attempt}/{max_attempts})"));
    }

    fn on_attempt_failed(&self, round: &Round, attempt: u32, reason: &str) {
        let msg = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} {} attempt {}  {}",
            red("✗"),
            round,
            attempt,
            dim(&msg)
        ));
    }

    fn on_section_resolved(&self, name: &str) {
        self.bar.println(format!("  {} {}", green("✓"), name));
    }

    fn on_generation_complete(&self, resolved: usize, success: bool) {
        let mark = if success { green("✔") } else { red("✘") };
        self.bar
            .println(format!("{} {} sections resolved", mark, bold(&resolved.to_string())));
    }

    fn on_chunk_submitted(&self, chunk: usize, chunks: usize) {
        self.bar.set_prefix("Publishing");
        self.bar.set_message(format!("chunk {chunk}/{chunks}"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a local paper into the configured database
  paper2notion paper.pdf

  # From arXiv (abs links are rewritten to the PDF)
  paper2notion https://arxiv.org/abs/1706.03762

  # All sections, with the model reading the PDF itself
  paper2notion --mode detailed --pdf-mode full paper.pdf

  # Print the summary without publishing
  paper2notion --dry-run paper.pdf
  paper2notion --dry-run --json paper.pdf > summary.json

  # Create missing database columns, then exit
  paper2notion --init-db

EXIT CODES:
  0  page published
  1  fatal error (input, extraction, configuration)
  2  summary generation failed (nothing published)
  3  publishing failed (a partial page may exist)

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Gemini API key (required)
  GOOGLE_MODEL            Default model (gemini-1.5-flash-002)
  NOTION_API_KEY          Notion integration token (required unless --dry-run)
  NOTION_DATABASE_ID      Target database (required unless --dry-run)
  PDFIUM_LIB_PATH         Path to libpdfium (text mode only)
  RUST_LOG                Override log filter

A .env file in the working directory is loaded first.
"#;

/// Summarise research papers with Gemini and publish them to Notion.
#[derive(Parser, Debug)]
#[command(
    name = "paper2notion",
    version,
    about = "Summarise research papers with Gemini and publish them to Notion",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: Option<String>,

    /// Gemini model ID (overrides GOOGLE_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Which sections to request: concise (required only) or detailed (all).
    #[arg(long, value_enum, default_value = "concise")]
    mode: ModeArg,

    /// How the paper reaches the model: text (pdfium text layer) or full (raw PDF).
    #[arg(long, value_enum, default_value = "text")]
    pdf_mode: PdfModeArg,

    /// LLM temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Print the summary instead of publishing it.
    #[arg(long)]
    dry_run: bool,

    /// Output JSON (summary or outcome) on stdout.
    #[arg(long)]
    json: bool,

    /// Add missing database columns and exit.
    #[arg(long)]
    init_db: bool,

    /// Add missing database columns before publishing.
    #[arg(long)]
    ensure_schema: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Concise,
    Detailed,
}

impl From<ModeArg> for SummaryMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Concise => SummaryMode::Concise,
            ModeArg::Detailed => SummaryMode::Detailed,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PdfModeArg {
    Text,
    Full,
}

impl From<PdfModeArg> for PdfMode {
    fn from(v: PdfModeArg) -> Self {
        match v {
            PdfModeArg::Text => PdfMode::Text,
            PdfModeArg::Full => PdfMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the variables may already be exported.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.init_db;
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

    let progress = show_progress.then(CliProgressCallback::new);
    let code = match run(&cli, progress.clone()).await {
        Ok(code) => code,
        Err(e) => {
            if let Some(p) = &progress {
                p.finish();
            }
            // Dry runs surface generation failures as errors.
            let code = match e.downcast_ref::<Paper2NotionError>() {
                Some(Paper2NotionError::Generation(_)) => EXIT_GENERATION_FAILED,
                _ => 1,
            };
            eprintln!("{} {:#}", red("✘"), e);
            return ExitCode::from(code);
        }
    };
    if let Some(p) = &progress {
        p.finish();
    }
    code
}

async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<ExitCode> {
    let config = build_config(cli, progress.map(|p| p as ProgressCallback))?;

    // ── Schema initialisation ────────────────────────────────────────────
    if cli.init_db || cli.ensure_schema {
        let credentials = Credentials::from_env()?;
        let notion = NotionClient::new(&credentials.notion_api_key);
        let added = initialize_database(&notion, &config.registry, &credentials.database_id)
            .await
            .context("Database initialisation failed")?;
        if !cli.quiet {
            eprintln!(
                "{} database schema {}",
                green("✔"),
                if added { "updated" } else { "already up to date" }
            );
        }
        if cli.init_db {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("No input given; pass a PDF path or URL");
    };

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let oracle = dry_run_oracle(&config)?;
        let summary = summarize(input, &oracle, &config).await?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            print!("{}", summary.to_markdown(&config.registry));
        }
        if !cli.quiet {
            eprintln!(
                "   {} oracle calls  /  {} input tokens",
                dim(&summary.oracle_calls.to_string()),
                dim(&summary.token_info.total().to_string()),
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Summarise and publish ────────────────────────────────────────────
    let credentials = Credentials::from_env()?;
    let oracle = paper2notion::summarize::gemini_oracle(&credentials, &config);
    let notion = NotionClient::new(&credentials.notion_api_key);
    let content = load_paper(input, &config).await?;
    let outcome = run_pipeline(content, &oracle, &notion, &config, &credentials.database_id).await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    }

    Ok(match outcome {
        PipelineOutcome::Success {
            page_id,
            token_info,
            blocks,
            chunks,
        } => {
            if !cli.quiet && !cli.json {
                eprintln!("{}  page {}", green("✔"), bold(&page_id));
                eprintln!(
                    "   {} blocks in {} request(s)  /  {} input tokens",
                    dim(&blocks.to_string()),
                    dim(&chunks.to_string()),
                    dim(&token_info.total().to_string()),
                );
            }
            ExitCode::SUCCESS
        }
        PipelineOutcome::GenerationFailed { failure } => {
            if !cli.json {
                eprintln!("{} summary generation failed: {}", red("✘"), failure);
            }
            ExitCode::from(EXIT_GENERATION_FAILED)
        }
        PipelineOutcome::PublishFailed { reason, page_id } => {
            if !cli.json {
                eprintln!("{} publishing failed: {}", red("✘"), reason);
                if let Some(id) = page_id {
                    eprintln!("   partial page left behind: {}", bold(&id));
                }
            }
            ExitCode::from(EXIT_PUBLISH_FAILED)
        }
    })
}

/// Map CLI args to `SummaryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .summary_mode(cli.mode.into())
        .pdf_mode(cli.pdf_mode.into())
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);
    if let Some(model) = &cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// A dry run only talks to Gemini, so the Notion variables are not required.
fn dry_run_oracle(config: &SummaryConfig) -> Result<GeminiOracle> {
    let key = std::env::var("GOOGLE_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(Paper2NotionError::MissingEnv {
            var: "GOOGLE_API_KEY",
        })?;
    let model = config
        .model
        .clone()
        .or_else(|| std::env::var("GOOGLE_MODEL").ok().filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    Ok(GeminiOracle::new(key.trim(), model)
        .with_system_instruction(SYSTEM_PROMPT)
        .with_generation(config.temperature, config.max_output_tokens))
}

//! # paper2notion
//!
//! Summarise research papers with Gemini and file the summaries in a Notion
//! database.
//!
//! ## Why a round protocol?
//!
//! Asking a model for a dozen headed sections in one reply works most of the
//! time, not all of the time: sections get skipped, headings get decorated,
//! replies get truncated. Rather than trusting one call, the summary is built
//! in rounds. The title is resolved on its own first, everything else is
//! requested in one bulk call, and each section still missing gets its own
//! small retry budget. The run succeeds only if every required section ends
//! up resolved.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (path or URL)
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   text layer via pdfium, or the raw file as base64
//!  ├─ 3. Title     title-only prompt, up to 5 attempts
//!  ├─ 4. Bulk      one prompt for every other section
//!  ├─ 5. Retry     one prompt per missing section (3 required / 1 optional)
//!  ├─ 6. Map       typed properties + markdown → Notion blocks
//!  └─ 7. Publish   create page, append remaining 90-block chunks
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2notion::{summarize_and_publish, Credentials, PipelineOutcome, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GOOGLE_API_KEY, NOTION_API_KEY, NOTION_DATABASE_ID
//!     let credentials = Credentials::from_env()?;
//!     let config = SummaryConfig::default();
//!     match summarize_and_publish("https://arxiv.org/abs/1706.03762", &credentials, &config).await? {
//!         PipelineOutcome::Success { page_id, token_info, .. } => {
//!             println!("created {page_id} ({} input tokens)", token_info.total());
//!         }
//!         PipelineOutcome::GenerationFailed { failure } => eprintln!("no summary: {failure}"),
//!         PipelineOutcome::PublishFailed { reason, .. } => eprintln!("not published: {reason}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2notion` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2notion = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod notion;
pub mod oracle;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod publish;
pub mod sections;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credentials, PdfMode, SummaryConfig, SummaryConfigBuilder, SummaryMode};
pub use error::{DocumentServiceError, GenerationFailure, OracleError, Paper2NotionError};
pub use notion::{DocumentService, NotionClient};
pub use oracle::{GeminiOracle, Oracle, PromptPart};
pub use output::{
    PipelineOutcome, PublishReceipt, Round, SectionMap, SectionValue, SummaryResult, TokenAccounting,
};
pub use parser::SectionParser;
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use publish::{build_document, PublishAdapter, PublishDocument, PublishFailure};
pub use sections::{SectionKind, SectionRegistry, SectionSpec};
pub use summarize::{
    initialize_database, run_pipeline, summarize, summarize_and_publish, summarize_and_publish_sync,
};

//! Caller-facing entry points.
//!
//! ```text
//! input ──▶ extract ──▶ SummaryOrchestrator ──▶ build_document ──▶ PublishAdapter
//! (path/URL)  (text|full)   (title/bulk/retry)     (properties+blocks)  (90-block chunks)
//! ```
//!
//! Fatal problems before the round protocol starts (input, extraction,
//! configuration) are `Err`. Once it starts, every ending is a
//! [`PipelineOutcome`].

use crate::config::{Credentials, SummaryConfig};
use crate::error::Paper2NotionError;
use crate::notion::{DocumentService, NotionClient};
use crate::oracle::{GeminiOracle, Oracle, PromptPart};
use crate::output::{PipelineOutcome, SummaryResult};
use crate::pipeline::extract::load_content;
use crate::pipeline::input::resolve_input;
use crate::pipeline::orchestrator::SummaryOrchestrator;
use crate::prompts::SYSTEM_PROMPT;
use crate::publish::{build_document, PublishAdapter};
use crate::sections::{SectionKind, SectionRegistry};
use std::time::Instant;
use tracing::{info, warn};

/// Resolve `input` and load it in the configured [`crate::PdfMode`].
pub async fn load_paper(input: &str, config: &SummaryConfig) -> Result<PromptPart, Paper2NotionError> {
    let resolved = resolve_input(input, config.download_timeout_secs).await?;
    let content = load_content(resolved.path(), config.pdf_mode).await?;
    Ok(content.to_prompt_part())
}

/// Summarise a paper without publishing it.
///
/// # Errors
/// Input and extraction failures, plus [`Paper2NotionError::Generation`]
/// when the round protocol gives up.
pub async fn summarize(
    input: impl AsRef<str>,
    oracle: &dyn Oracle,
    config: &SummaryConfig,
) -> Result<SummaryResult, Paper2NotionError> {
    let input = input.as_ref();
    info!("Summarising {} with {}", input, oracle.model());
    let content = load_paper(input, config).await?;
    let result = SummaryOrchestrator::new(oracle, config, content).run().await?;
    Ok(result)
}

/// Generate and publish from already-loaded content.
///
/// The document service is only touched when generation succeeded.
pub async fn run_pipeline(
    content: PromptPart,
    oracle: &dyn Oracle,
    docs: &dyn DocumentService,
    config: &SummaryConfig,
    database_id: &str,
) -> PipelineOutcome {
    let start = Instant::now();
    let summary = match SummaryOrchestrator::new(oracle, config, content).run().await {
        Ok(summary) => summary,
        Err(failure) => {
            warn!("Generation failed: {}", failure);
            return PipelineOutcome::GenerationFailed { failure };
        }
    };

    let document = build_document(&config.registry, &summary.sections);
    let adapter = PublishAdapter::new(docs, config.block_chunk_size)
        .with_progress(config.progress_callback.clone());
    match adapter.publish(database_id, &document).await {
        Ok(receipt) => {
            info!(
                "Published page {} ({} blocks, {} oracle calls) in {}ms",
                receipt.page_id,
                receipt.blocks,
                summary.oracle_calls,
                start.elapsed().as_millis()
            );
            PipelineOutcome::success(receipt, summary.token_info)
        }
        Err(failure) => {
            warn!("Publish failed: {}", failure.reason);
            PipelineOutcome::PublishFailed {
                reason: failure.reason,
                page_id: failure.page_id,
            }
        }
    }
}

/// Gemini client configured from credentials and run settings.
pub fn gemini_oracle(credentials: &Credentials, config: &SummaryConfig) -> GeminiOracle {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| credentials.default_model.clone());
    GeminiOracle::new(&credentials.google_api_key, model)
        .with_system_instruction(SYSTEM_PROMPT)
        .with_generation(config.temperature, config.max_output_tokens)
}

/// The full pipeline against the live services.
///
/// # Errors
/// Only failures before the round protocol starts; everything after is
/// reported through the returned [`PipelineOutcome`].
pub async fn summarize_and_publish(
    input: impl AsRef<str>,
    credentials: &Credentials,
    config: &SummaryConfig,
) -> Result<PipelineOutcome, Paper2NotionError> {
    let input = input.as_ref();
    let oracle = gemini_oracle(credentials, config);
    let notion = NotionClient::new(&credentials.notion_api_key);
    info!("Summarising {} with {}", input, oracle.model());

    let content = load_paper(input, config).await?;
    Ok(run_pipeline(content, &oracle, &notion, config, &credentials.database_id).await)
}

/// Synchronous wrapper around [`summarize_and_publish`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_and_publish_sync(
    input: impl AsRef<str>,
    credentials: &Credentials,
    config: &SummaryConfig,
) -> Result<PipelineOutcome, Paper2NotionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Paper2NotionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize_and_publish(input, credentials, config))
}

/// Add a column for every database-property section the database lacks.
///
/// A Notion database has exactly one title column. If it exists under a
/// different name the title section is not added; publishing will then
/// fail until one of the two is renamed.
///
/// # Returns
/// Whether any column was added.
pub async fn initialize_database(
    docs: &dyn DocumentService,
    registry: &SectionRegistry,
    database_id: &str,
) -> Result<bool, Paper2NotionError> {
    let existing = docs.database_properties(database_id).await?;
    let mut added = 0;

    for spec in registry.database_properties() {
        let wanted = spec.kind.notion_type();
        if let Some(actual) = existing.get(&spec.name) {
            if actual != wanted {
                warn!(
                    "Column '{}' is {} but the section needs {}",
                    spec.name, actual, wanted
                );
            }
            continue;
        }
        if spec.kind == SectionKind::Title {
            if let Some((other, _)) = existing.iter().find(|(_, t)| t.as_str() == "title") {
                warn!(
                    "Database title column is '{}', not '{}'; rename one of them",
                    other, spec.name
                );
                continue;
            }
        }
        info!("Adding {} column '{}'", wanted, spec.name);
        docs.add_database_property(database_id, &spec.name, spec.kind)
            .await?;
        added += 1;
    }

    Ok(added > 0)
}

//! Publishing: resolved sections → a Notion page.
//!
//! Building the document is pure ([`build_document`]); submitting it is the
//! only step with side effects ([`PublishAdapter::publish`]). Notion caps a
//! request at 100 children, so the body goes out in fixed-size chunks: the
//! first rides along with page creation, the rest are appended in order.
//!
//! A failure after the page exists leaves a partial page behind. It is not
//! deleted; the failure carries its id so the caller can clean up.

use crate::error::DocumentServiceError;
use crate::notion::blocks::{Block, RichText};
use crate::notion::markdown::markdown_to_blocks;
use crate::notion::properties::{build_properties, sanitize_tags, PageProperties};
use crate::notion::DocumentService;
use crate::output::{PublishReceipt, SectionMap, SectionValue};
use crate::progress::ProgressCallback;
use crate::sections::{SectionKind, SectionRegistry};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Emoji of the keyword callout at the top of the body.
pub const KEYWORDS_EMOJI: &str = "🔑";

/// Everything sent for one page. Built once, submitted once.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishDocument {
    pub properties: PageProperties,
    pub blocks: Vec<Block>,
}

/// Map resolved sections onto properties and body blocks.
///
/// Body layout: a table of contents, one callout per resolved tag-list
/// section, then for each resolved rich-text section in registry order a
/// `heading_2`, its formatted content and a divider. The title only appears
/// as a property.
pub fn build_document(registry: &SectionRegistry, sections: &SectionMap) -> PublishDocument {
    let mut blocks = vec![Block::TableOfContents];

    for spec in registry.specs().iter().filter(|s| s.kind == SectionKind::TagList) {
        let tags = match sections.get(&spec.name) {
            Some(SectionValue::Tags(tags)) => sanitize_tags(tags),
            Some(SectionValue::Text(text)) => sanitize_tags(&crate::parser::split_tags(text)),
            None => continue,
        };
        if tags.is_empty() {
            continue;
        }
        blocks.push(Block::Callout {
            text: vec![RichText::plain(format!("{}: {}", spec.name, tags.join(", ")))],
            emoji: KEYWORDS_EMOJI.to_string(),
        });
    }

    for spec in registry.specs().iter().filter(|s| s.kind == SectionKind::RichText) {
        let Some(value) = sections.get(&spec.name) else {
            continue;
        };
        blocks.push(Block::heading(2, spec.name.as_str()));
        blocks.extend(markdown_to_blocks(&value.to_plain()));
        blocks.push(Block::Divider);
    }

    PublishDocument {
        properties: build_properties(registry, sections),
        blocks,
    }
}

/// Why a publish did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct PublishFailure {
    pub reason: String,
    /// Set when the page was created before the failure.
    pub page_id: Option<String>,
}

/// Submits a [`PublishDocument`] through a [`DocumentService`].
pub struct PublishAdapter<'a> {
    service: &'a dyn DocumentService,
    chunk_size: usize,
    progress: Option<ProgressCallback>,
}

impl<'a> PublishAdapter<'a> {
    pub fn new(service: &'a dyn DocumentService, chunk_size: usize) -> Self {
        Self {
            service,
            chunk_size: chunk_size.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Number of requests needed for `blocks` body blocks. A page with no
    /// body still takes one create call.
    pub fn chunk_count(&self, blocks: usize) -> usize {
        blocks.div_ceil(self.chunk_size).max(1)
    }

    /// Create the page and append the remaining chunks sequentially.
    pub async fn publish(
        &self,
        database_id: &str,
        document: &PublishDocument,
    ) -> Result<PublishReceipt, PublishFailure> {
        let chunks: Vec<&[Block]> = document.blocks.chunks(self.chunk_size).collect();
        let total = self.chunk_count(document.blocks.len());
        let first = chunks.first().copied().unwrap_or(&[]);

        info!(
            "Publishing {} properties and {} blocks in {} request(s)",
            document.properties.len(),
            document.blocks.len(),
            total
        );

        let page_id = self
            .service
            .create_page(database_id, &document.properties, first)
            .await
            .map_err(|e| failure("page creation failed", e, None))?;
        debug!("Created page {}", page_id);
        self.report(1, total);

        for (idx, chunk) in chunks.iter().enumerate().skip(1) {
            let n = idx + 1;
            if let Err(e) = self.service.append_blocks(&page_id, chunk).await {
                warn!(
                    "Chunk {}/{} failed; page {} is left partially written",
                    n, total, page_id
                );
                return Err(failure(
                    &format!("appending chunk {n}/{total} failed"),
                    e,
                    Some(page_id),
                ));
            }
            debug!("Appended chunk {}/{} ({} blocks)", n, total, chunk.len());
            self.report(n, total);
        }

        Ok(PublishReceipt {
            page_id,
            blocks: document.blocks.len(),
            chunks: total,
        })
    }

    fn report(&self, chunk: usize, chunks: usize) {
        if let Some(cb) = &self.progress {
            cb.on_chunk_submitted(chunk, chunks);
        }
    }
}

fn failure(context: &str, err: DocumentServiceError, page_id: Option<String>) -> PublishFailure {
    PublishFailure {
        reason: format!("{context}: {err}"),
        page_id,
    }
}

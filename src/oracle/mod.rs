//! The generative-model seam.
//!
//! The orchestrator only sees [`Oracle`]: a `generate` call that returns the
//! reply text and a `count_tokens` call used for accounting. Both take the
//! same prompt parts. [`GeminiOracle`] is the production implementation;
//! tests script their own.

pub mod gemini;

use crate::error::OracleError;
use async_trait::async_trait;
use std::sync::Arc;

pub use gemini::GeminiOracle;

/// A raw document handed to the model's native ingestion channel.
///
/// Cloning is cheap: the base64 payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub mime_type: String,
    /// Base64-encoded file content.
    pub data: Arc<str>,
    /// Original file size in bytes, for logging.
    pub size_bytes: usize,
}

/// One element of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Document(DocumentHandle),
}

impl PromptPart {
    pub fn text(s: impl Into<String>) -> Self {
        PromptPart::Text(s.into())
    }
}

/// A generative-language-model service.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Model identifier, for logs and results.
    fn model(&self) -> &str;

    /// Produce a reply for the given prompt parts.
    async fn generate(&self, parts: &[PromptPart]) -> Result<String, OracleError>;

    /// Count the input tokens the parts would consume.
    async fn count_tokens(&self, parts: &[PromptPart]) -> Result<u64, OracleError>;
}

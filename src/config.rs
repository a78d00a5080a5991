//! Configuration types for a summarise-and-publish run.
//!
//! Run behaviour is controlled through [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. Service credentials live apart from it in
//! [`Credentials`], loaded once from the environment at process start.
//!
//! # Design choice: builder over constructor
//! Most callers change two or three knobs (model, summary mode, PDF mode).
//! The builder lets them set only those and keep the documented defaults for
//! retry budgets, timeouts and chunk sizes.

use crate::error::Paper2NotionError;
use crate::progress::ProgressCallback;
use crate::sections::SectionRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Model used when neither the caller nor `GOOGLE_MODEL` names one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-002";

/// Maximum blocks per Notion request is 100; stay below it.
pub const DEFAULT_BLOCK_CHUNK_SIZE: usize = 90;

/// Configuration for one summarise-and-publish run.
///
/// # Example
/// ```rust
/// use paper2notion::{PdfMode, SummaryConfig, SummaryMode};
///
/// let config = SummaryConfig::builder()
///     .model("gemini-1.5-pro-002")
///     .summary_mode(SummaryMode::Detailed)
///     .pdf_mode(PdfMode::Full)
///     .build()
///     .unwrap();
/// assert_eq!(config.title_attempts, 5);
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Model identifier. If None, the credentials' default model is used.
    pub model: Option<String>,

    /// Coverage dial. Default: [`SummaryMode::Concise`].
    pub summary_mode: SummaryMode,

    /// How the PDF reaches the model. Default: [`PdfMode::Text`].
    pub pdf_mode: PdfMode,

    /// The sections to produce. Default: the built-in paper-reading registry.
    pub registry: SectionRegistry,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum output tokens per generation call. Default: 8192.
    ///
    /// A detailed bulk round asks for a dozen long-form sections in one reply;
    /// a low ceiling truncates the tail sections, which then fall through to
    /// per-section retries.
    pub max_output_tokens: u32,

    /// Attempts for the title-only round. Default: 5.
    pub title_attempts: u32,

    /// Per-section attempts for a required section missing after the bulk round. Default: 3.
    pub required_attempts: u32,

    /// Per-section attempts for an optional section missing after the bulk round. Default: 1.
    pub optional_attempts: u32,

    /// Base delay between attempts of one retry scope, doubled each time. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-oracle-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Blocks per Notion request (create or append). Range 1–100. Default: 90.
    pub block_chunk_size: usize,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: None,
            summary_mode: SummaryMode::default(),
            pdf_mode: PdfMode::default(),
            registry: SectionRegistry::default(),
            temperature: 0.2,
            max_output_tokens: 8192,
            title_attempts: 5,
            required_attempts: 3,
            optional_attempts: 1,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            block_chunk_size: DEFAULT_BLOCK_CHUNK_SIZE,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("model", &self.model)
            .field("summary_mode", &self.summary_mode)
            .field("pdf_mode", &self.pdf_mode)
            .field("sections", &self.registry.specs().len())
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("title_attempts", &self.title_attempts)
            .field("required_attempts", &self.required_attempts)
            .field("optional_attempts", &self.optional_attempts)
            .field("block_chunk_size", &self.block_chunk_size)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SummaryProgressCallback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Attempt budget for a section missing after the bulk round.
    pub fn attempts_for(&self, required: bool) -> u32 {
        if required {
            self.required_attempts
        } else {
            self.optional_attempts
        }
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn summary_mode(mut self, mode: SummaryMode) -> Self {
        self.config.summary_mode = mode;
        self
    }

    pub fn pdf_mode(mut self, mode: PdfMode) -> Self {
        self.config.pdf_mode = mode;
        self
    }

    pub fn registry(mut self, registry: SectionRegistry) -> Self {
        self.config.registry = registry;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn title_attempts(mut self, n: u32) -> Self {
        self.config.title_attempts = n;
        self
    }

    pub fn required_attempts(mut self, n: u32) -> Self {
        self.config.required_attempts = n;
        self
    }

    pub fn optional_attempts(mut self, n: u32) -> Self {
        self.config.optional_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn block_chunk_size(mut self, n: usize) -> Self {
        self.config.block_chunk_size = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, Paper2NotionError> {
        let c = &self.config;
        if c.title_attempts == 0 || c.required_attempts == 0 {
            return Err(Paper2NotionError::InvalidConfig(
                "title and required-section attempts must be ≥ 1".into(),
            ));
        }
        if c.block_chunk_size == 0 || c.block_chunk_size > 100 {
            return Err(Paper2NotionError::InvalidConfig(format!(
                "block chunk size must be 1–100, got {}",
                c.block_chunk_size
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(Paper2NotionError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if matches!(c.model.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err(Paper2NotionError::InvalidConfig(
                "model identifier must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How many sections a run asks for.
///
/// This is a coverage dial, not a quality dial: both modes use the same
/// instructions per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Required sections only. (default)
    #[default]
    Concise,
    /// Every section in the registry.
    Detailed,
}

impl FromStr for SummaryMode {
    type Err = Paper2NotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" => Ok(SummaryMode::Concise),
            "detailed" => Ok(SummaryMode::Detailed),
            other => Err(Paper2NotionError::InvalidConfig(format!(
                "summary mode must be 'concise' or 'detailed', got '{other}'"
            ))),
        }
    }
}

/// How the PDF reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfMode {
    /// Extract plain text from every page and send it as text. (default)
    #[default]
    Text,
    /// Send the raw file through the model's native document channel.
    Full,
}

impl FromStr for PdfMode {
    type Err = Paper2NotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PdfMode::Text),
            "full" => Ok(PdfMode::Full),
            other => Err(Paper2NotionError::InvalidConfig(format!(
                "PDF mode must be 'text' or 'full', got '{other}'"
            ))),
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Service credentials and targets, validated once at start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Gemini API key (`GOOGLE_API_KEY`).
    pub google_api_key: String,
    /// Default model (`GOOGLE_MODEL`, falling back to [`DEFAULT_MODEL`]).
    pub default_model: String,
    /// Notion integration token (`NOTION_API_KEY`).
    pub notion_api_key: String,
    /// Target database (`NOTION_DATABASE_ID`).
    pub database_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("default_model", &self.default_model)
            .field("notion_api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, Paper2NotionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup (used by tests and by
    /// callers that keep configuration elsewhere).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Paper2NotionError> {
        let required = |var: &'static str| -> Result<String, Paper2NotionError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(Paper2NotionError::MissingEnv { var })
        };

        Ok(Self {
            google_api_key: required("GOOGLE_API_KEY")?,
            default_model: lookup("GOOGLE_MODEL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            notion_api_key: required("NOTION_API_KEY")?,
            database_id: required("NOTION_DATABASE_ID")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let config = SummaryConfig::default();
        assert_eq!(config.summary_mode, SummaryMode::Concise);
        assert_eq!(config.pdf_mode, PdfMode::Text);
        assert_eq!(config.title_attempts, 5);
        assert_eq!(config.attempts_for(true), 3);
        assert_eq!(config.attempts_for(false), 1);
        assert_eq!(config.block_chunk_size, 90);
    }

    #[test]
    fn builder_rejects_zero_title_attempts() {
        assert!(SummaryConfig::builder().title_attempts(0).build().is_err());
    }

    #[test]
    fn builder_rejects_oversized_chunks() {
        assert!(SummaryConfig::builder().block_chunk_size(101).build().is_err());
        assert!(SummaryConfig::builder().block_chunk_size(100).build().is_ok());
    }

    #[test]
    fn builder_rejects_blank_model() {
        assert!(SummaryConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let config = SummaryConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Detailed".parse::<SummaryMode>().unwrap(), SummaryMode::Detailed);
        assert_eq!(" text ".parse::<PdfMode>().unwrap(), PdfMode::Text);
        assert!("verbose".parse::<SummaryMode>().is_err());
        assert!("images".parse::<PdfMode>().is_err());
    }

    #[test]
    fn credentials_complete() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("NOTION_API_KEY", "n"),
            ("NOTION_DATABASE_ID", "db"),
        ]))
        .unwrap();
        assert_eq!(creds.default_model, DEFAULT_MODEL);
        assert_eq!(creds.database_id, "db");
    }

    #[test]
    fn credentials_model_override() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("GOOGLE_MODEL", "gemini-2.0-flash"),
            ("NOTION_API_KEY", "n"),
            ("NOTION_DATABASE_ID", "db"),
        ]))
        .unwrap();
        assert_eq!(creds.default_model, "gemini-2.0-flash");
    }

    #[test]
    fn credentials_missing_is_fatal() {
        let err = Credentials::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("NOTION_API_KEY", "   "),
            ("NOTION_DATABASE_ID", "db"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            Paper2NotionError::MissingEnv {
                var: "NOTION_API_KEY"
            }
        ));
    }

    #[test]
    fn credentials_debug_redacts_keys() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "secret-g"),
            ("NOTION_API_KEY", "secret-n"),
            ("NOTION_DATABASE_ID", "db"),
        ]))
        .unwrap();
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("secret"));
    }
}

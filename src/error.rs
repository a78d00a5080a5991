//! Error types for the paper2notion library.
//!
//! Failures fall into three tiers that travel differently:
//!
//! * [`Paper2NotionError`]: **fatal**, the run cannot start at all (bad
//!   input file, unreadable PDF, missing credentials). Returned as
//!   `Err(Paper2NotionError)` from the top-level `summarize*` functions.
//!
//! * [`OracleError`]: **transient**, a single generation or token-count call
//!   failed. It is logged and counted against the current retry budget; it
//!   never crosses the orchestrator boundary.
//!
//! * [`DocumentServiceError`]: a Notion call failed. During publishing it is
//!   folded into [`crate::output::PipelineOutcome::PublishFailed`]; during
//!   schema initialisation it surfaces as a fatal error.
//!
//! [`GenerationFailure`] is not an error in the `Result` sense: it is the
//! payload of the "generation failed" outcome and says which guarantee the
//! round protocol could not meet.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2notion library.
#[derive(Debug, Error)]
pub enum Paper2NotionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; encrypted papers are not supported.
    #[error("PDF '{path}' is encrypted and cannot be read without a password")]
    PasswordRequired { path: PathBuf },

    /// Text mode produced nothing to summarise (scanned paper without a text layer).
    #[error("No extractable text in '{path}' ({pages} pages)\nRetry with --pdf-mode full.")]
    NoExtractableText { path: PathBuf, pages: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium for your platform or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// A required environment variable is absent or empty.
    #[error("Missing required environment variable {var}\nSet it in the environment or in a .env file.")]
    MissingEnv { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// Generation failed in a run that has no tri-state outcome (dry run).
    #[error("Summary generation failed: {0}")]
    Generation(#[from] GenerationFailure),

    /// A document-service call outside the publish step failed.
    #[error("Notion request failed: {0}")]
    DocumentService(#[from] DocumentServiceError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed generation or token-count call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// Non-2xx answer that is not one of the specialised cases below.
    #[error("LLM API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP 429 / RESOURCE_EXHAUSTED.
    #[error("LLM rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401 / 403. Retrying is unlikely to help but stays within budget.
    #[error("LLM authentication error: {detail}")]
    Auth { detail: String },

    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Connection-level failure.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The model answered without any text (safety block, empty candidate).
    #[error("LLM returned no text{}", .reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyResponse { reason: Option<String> },

    /// The response body could not be decoded.
    #[error("Failed to decode LLM response: {0}")]
    Decode(String),
}

/// A failed Notion API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentServiceError {
    /// Non-2xx answer carrying Notion's `{code, message}` error object.
    #[error("Notion API returned HTTP {status} ({code}): {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    /// HTTP 429.
    #[error("Notion rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401 / 403.
    #[error("Notion authentication error: {detail}")]
    Auth { detail: String },

    /// Connection-level failure.
    #[error("Notion transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Failed to decode Notion response: {0}")]
    Decode(String),
}

/// Why the round protocol gave up. No publish is attempted after either.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenerationFailure {
    /// The title-only round exhausted its attempts.
    #[error("title could not be extracted after {attempts} attempts")]
    TitleUnresolved { attempts: u32 },

    /// At least one required section stayed missing after its retries.
    #[error("required sections unresolved after retries: {}", .missing.join(", "))]
    RequiredSectionsUnresolved { missing: Vec<String> },
}

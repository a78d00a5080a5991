//! PDF content extraction for the two ingestion modes.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does CPU-bound work. `tokio::task::spawn_blocking` moves text
//! extraction onto the blocking pool so Tokio worker threads never stall.
//!
//! ## Library lookup
//!
//! pdfium is bound at runtime, tried in this order:
//! 1. `PDFIUM_LIB_PATH` (a library file or the directory holding it)
//! 2. the current directory
//! 3. the system library search path

use crate::config::PdfMode;
use crate::error::Paper2NotionError;
use crate::oracle::PromptPart;
use crate::pipeline::encode::encode_document;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Paper content in the form the oracle will receive it.
#[derive(Debug, Clone)]
pub enum PdfContent {
    /// Text layer of every page, concatenated in page order.
    Text { text: String, pages: usize },
    /// The raw file for the model's native document channel.
    Document(crate::oracle::DocumentHandle),
}

impl PdfContent {
    /// The content part that leads every prompt.
    pub fn to_prompt_part(&self) -> PromptPart {
        match self {
            PdfContent::Text { text, .. } => PromptPart::Text(text.clone()),
            PdfContent::Document(handle) => PromptPart::Document(handle.clone()),
        }
    }
}

/// Load the paper according to `mode`.
pub async fn load_content(path: &Path, mode: PdfMode) -> Result<PdfContent, Paper2NotionError> {
    match mode {
        PdfMode::Text => {
            let (text, pages) = extract_text(path).await?;
            Ok(PdfContent::Text { text, pages })
        }
        PdfMode::Full => Ok(PdfContent::Document(encode_document(path).await?)),
    }
}

/// Extract the text layer of every page.
///
/// # Returns
/// `(text, page_count)`. Pages are joined with a newline.
///
/// # Errors
/// [`Paper2NotionError::NoExtractableText`] when no page has any text, which
/// usually means a scanned paper; "full" mode handles those.
pub async fn extract_text(path: &Path) -> Result<(String, usize), Paper2NotionError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| Paper2NotionError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_text_blocking(pdf_path: &Path) -> Result<(String, usize), Paper2NotionError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Paper2NotionError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Paper2NotionError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut page_texts = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => {
                let text = text.all();
                debug!("Page {}: {} chars of text", idx + 1, text.chars().count());
                page_texts.push(text);
            }
            Err(e) => warn!("Page {}: text extraction failed: {:?}", idx + 1, e),
        }
    }

    let text = page_texts.join("\n");
    if text.trim().is_empty() {
        return Err(Paper2NotionError::NoExtractableText {
            path: pdf_path.to_path_buf(),
            pages: total_pages,
        });
    }
    Ok((text, total_pages))
}

/// Bind to pdfium, trying each location in turn.
fn bind_pdfium() -> Result<Pdfium, Paper2NotionError> {
    let mut failures = Vec::new();

    if let Ok(configured) = std::env::var("PDFIUM_LIB_PATH") {
        let candidate = library_path(Path::new(&configured));
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => failures.push(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(e) => failures.push(format!("{}: {:?}", local.display(), e)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            failures.push(format!("system library: {:?}", e));
            Err(Paper2NotionError::PdfiumBindingFailed(failures.join("; ")))
        }
    }
}

/// Accept either the library file itself or its directory.
fn library_path(configured: &Path) -> PathBuf {
    if configured.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(configured)
    } else {
        configured.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_becomes_text_part() {
        let content = PdfContent::Text {
            text: "Attention Is All You Need".into(),
            pages: 15,
        };
        assert_eq!(
            content.to_prompt_part(),
            PromptPart::text("Attention Is All You Need")
        );
    }

    #[test]
    fn library_path_keeps_files() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_path(p), p.to_path_buf());
    }

    #[test]
    fn library_path_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = library_path(dir.path());
        assert_eq!(resolved.parent(), Some(dir.path()));
        assert!(resolved.to_string_lossy().contains("pdfium"));
    }

    #[tokio::test]
    async fn full_mode_skips_pdfium() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.4").unwrap();
        let content = load_content(f.path(), PdfMode::Full).await.unwrap();
        match content {
            PdfContent::Document(handle) => assert_eq!(handle.size_bytes, 8),
            other => panic!("expected document, got {other:?}"),
        }
    }
}

//! Input resolution: normalise a user-supplied path or URL to a local PDF.
//!
//! ## Why download to a temp file?
//!
//! pdfium opens documents from the file system, and "full" mode re-reads the
//! raw bytes. Downloading into a `TempDir` gives both a path while ensuring
//! cleanup when [`ResolvedInput`] is dropped. The `%PDF` magic bytes are
//! checked before returning so callers get a meaningful error rather than a
//! pdfium failure or a model summarising an HTML error page.

use crate::error::Paper2NotionError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input, either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory that is removed
    /// when this value is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF path.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, Paper2NotionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Paper2NotionError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(&arxiv_pdf_url(input), timeout_secs).await
    } else if input.contains("://") {
        Err(Paper2NotionError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        resolve_local(input)
    }
}

/// Rewrite an arXiv abstract page link to the PDF it describes.
///
/// `https://arxiv.org/abs/1706.03762v7` → `https://arxiv.org/pdf/1706.03762v7`.
/// Any other URL is returned unchanged.
pub fn arxiv_pdf_url(url: &str) -> String {
    for prefix in ["https://arxiv.org/abs/", "http://arxiv.org/abs/"] {
        if let Some(id) = url.strip_prefix(prefix) {
            return format!("https://arxiv.org/pdf/{}", id.trim_end_matches('/'));
        }
    }
    url.to_string()
}

/// Validate existence, readability and the PDF magic bytes of a local file.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Paper2NotionError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(Paper2NotionError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let _ = f.read(&mut magic);
            if &magic != b"%PDF" {
                return Err(Paper2NotionError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Paper2NotionError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Paper2NotionError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Paper2NotionError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| Paper2NotionError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Paper2NotionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let filename = filename_from_url(url);
    let temp_dir = TempDir::new().map_err(|e| Paper2NotionError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Paper2NotionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Paper2NotionError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Paper2NotionError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// A file name for the download: the last URL path segment, with `.pdf`
/// appended when it has no extension (arXiv PDF links have none).
fn filename_from_url(url: &str) -> String {
    let segment = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|last| !last.is_empty())
    });

    match segment {
        Some(last) if last.to_ascii_lowercase().ends_with(".pdf") => last,
        Some(last) => format!("{last}.pdf"),
        None => "downloaded.pdf".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://arxiv.org/pdf/1706.03762"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_arxiv_abs_rewritten() {
        assert_eq!(
            arxiv_pdf_url("https://arxiv.org/abs/1706.03762v7"),
            "https://arxiv.org/pdf/1706.03762v7"
        );
        assert_eq!(
            arxiv_pdf_url("https://example.com/paper.pdf"),
            "https://example.com/paper.pdf"
        );
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.org/a/paper.pdf"), "paper.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706.03762"), "1706.03762.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.err().unwrap();
        assert!(matches!(err, Paper2NotionError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_with_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<html>nope</html>").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5)
            .await
            .err()
            .unwrap();
        match err {
            Paper2NotionError::NotAPdf { magic, .. } => assert_eq!(&magic, b"<htm"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        let resolved = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[tokio::test]
    async fn unsupported_scheme_is_invalid() {
        let err = resolve_input("ftp://host/paper.pdf", 5).await.err().unwrap();
        assert!(matches!(err, Paper2NotionError::InvalidInput { .. }));
    }
}

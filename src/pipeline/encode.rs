//! Raw-document encoding: PDF bytes → base64 [`DocumentHandle`].
//!
//! In "full" mode the model reads the PDF itself (layout, figures, formulae)
//! instead of the flattened text layer. Gemini accepts documents inline as
//! base64 in the JSON request body, so no upload step is needed.

use crate::error::Paper2NotionError;
use crate::oracle::DocumentHandle;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Inline request payloads above this size are rejected by the API.
const INLINE_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Read and base64-encode a PDF for the model's document channel.
pub async fn encode_document(path: &Path) -> Result<DocumentHandle, Paper2NotionError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Paper2NotionError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Paper2NotionError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Paper2NotionError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;
    Ok(encode_bytes(&bytes))
}

/// Encode in-memory PDF bytes.
pub fn encode_bytes(bytes: &[u8]) -> DocumentHandle {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded PDF: {} bytes → {} bytes base64", bytes.len(), b64.len());
    if b64.len() > INLINE_LIMIT_BYTES {
        warn!(
            "Encoded PDF is {} MiB; inline requests above 20 MiB are likely to be rejected",
            b64.len() / (1024 * 1024)
        );
    }
    DocumentHandle {
        mime_type: PDF_MIME_TYPE.to_string(),
        data: Arc::from(b64),
        size_bytes: bytes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn encode_small_document() {
        let data = encode_bytes(b"%PDF-1.4\n%%EOF");
        assert_eq!(data.mime_type, "application/pdf");
        assert_eq!(data.size_bytes, 14);
        let decoded = STANDARD.decode(data.data.as_bytes()).expect("valid base64");
        assert_eq!(decoded, b"%PDF-1.4\n%%EOF");
    }

    #[tokio::test]
    async fn encode_file_reads_bytes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7").unwrap();
        let data = encode_document(f.path()).await.unwrap();
        assert_eq!(&*data.data, "JVBERi0xLjc=");
    }

    #[tokio::test]
    async fn encode_missing_file_fails() {
        let err = encode_document(Path::new("/no/such/file.pdf")).await.unwrap_err();
        assert!(matches!(err, Paper2NotionError::FileNotFound { .. }));
    }
}

//! PDF text extraction.
//!
//! Wraps the `pdf-extract` crate. The parser can panic on malformed input,
//! so panics are caught and reported as extraction failures.

use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("content is not a PDF document")]
    NotPdf,

    #[error("failed to extract text: {0}")]
    Failed(String),
}

/// Turns raw PDF bytes into plain text.
///
/// Implementations are blocking; callers run them on a blocking thread.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError>;
}

/// Returns true when the bytes carry a PDF signature.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    infer::get(bytes)
        .map(|kind| kind.mime_type() == "application/pdf")
        .unwrap_or(false)
}

/// `pdf-extract` backed extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ExtractionError> {
        if !looks_like_pdf(pdf) {
            return Err(ExtractionError::NotPdf);
        }

        match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(pdf))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::Failed(e.to_string())),
            Err(_) => Err(ExtractionError::Failed(
                "PDF parser crashed on malformed input".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_detection() {
        assert!(looks_like_pdf(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj"));
        assert!(!looks_like_pdf(b"PK\x03\x04 not a pdf"));
        assert!(!looks_like_pdf(b""));
    }

    #[test]
    fn test_non_pdf_is_rejected_before_parsing() {
        let err = PdfExtractor.extract_text(b"hello world").unwrap_err();
        assert!(matches!(err, ExtractionError::NotPdf));
    }

    #[test]
    fn test_truncated_pdf_fails_cleanly() {
        // Either a parse error or nothing usable, never a panic
        match PdfExtractor.extract_text(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog") {
            Err(ExtractionError::Failed(_)) => {}
            Ok(text) => assert!(text.trim().is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

//! File selection for the client.
//!
//! Mirrors the server's checks so obviously bad files never leave the
//! machine. The server re-validates everything independently.

use std::sync::Arc;
use thiserror::Error;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// A file offered for analysis, before validation.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    /// Media type as declared by the file picker or guessed from the name.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    /// Candidate whose declared type is guessed from the file name.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }
}

/// An accepted file. Immutable; replaced wholesale by the next selection.
#[derive(Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No file was selected")]
    NoFile,

    #[error("Please select a single PDF file")]
    TooManyFiles,

    #[error("Only PDF files are supported (got {0})")]
    WrongType(String),

    #[error("File is larger than the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: u64 },
}

/// Validate a drop that may contain several files; exactly one is accepted.
pub fn select_one(
    mut candidates: Vec<UploadCandidate>,
    max_bytes: u64,
) -> Result<Arc<UploadedFile>, SelectionError> {
    match candidates.len() {
        0 => Err(SelectionError::NoFile),
        1 => select_file(candidates.remove(0), max_bytes),
        _ => Err(SelectionError::TooManyFiles),
    }
}

/// Validate a single candidate.
pub fn select_file(
    candidate: UploadCandidate,
    max_bytes: u64,
) -> Result<Arc<UploadedFile>, SelectionError> {
    let essence = candidate
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence != PDF_MEDIA_TYPE {
        return Err(SelectionError::WrongType(candidate.content_type));
    }
    if candidate.bytes.len() as u64 > max_bytes {
        return Err(SelectionError::TooLarge {
            limit_bytes: max_bytes,
        });
    }

    Ok(Arc::new(UploadedFile {
        name: candidate.name,
        content_type: PDF_MEDIA_TYPE.to_string(),
        bytes: candidate.bytes,
    }))
}

//! Unified API error handling
//!
//! Every failure of the analysis endpoint maps to a stable error code so
//! clients can tell input problems apart from service outages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No PDF file was uploaded")]
    NoFile,

    #[error("Only one file may be uploaded per request")]
    MultipleFiles,

    #[error("Only PDF files are supported: {0}")]
    UnsupportedFileType(String),

    #[error("File exceeds the maximum upload size of {limit_bytes} bytes")]
    FileTooLarge { limit_bytes: u64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("The PDF contains no extractable text. It may be empty or consist only of scanned images")]
    EmptyOrImageOnlyPdf,

    #[error("Could not read the PDF: {0}")]
    Extraction(String),

    #[error("AI analysis is not configured on this server")]
    AiNotConfigured,

    #[error("AI response could not be parsed: {0}")]
    AiResponseUnparseable(String),

    #[error("AI service request failed: {0}")]
    AiRequestFailed(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// JSON body of every error response.
///
/// Also decoded by the client to classify failed analyses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub const AI_NOT_CONFIGURED: &str = "AI_NOT_CONFIGURED";
pub const EMPTY_OR_IMAGE_ONLY_PDF: &str = "EMPTY_OR_IMAGE_ONLY_PDF";
pub const AI_RESPONSE_UNPARSEABLE: &str = "AI_RESPONSE_UNPARSEABLE";

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoFile
            | Self::MultipleFiles
            | Self::UnsupportedFileType(_)
            | Self::FileTooLarge { .. }
            | Self::BadRequest(_)
            | Self::EmptyOrImageOnlyPdf
            | Self::Extraction(_) => StatusCode::BAD_REQUEST,
            Self::AiNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::AiResponseUnparseable(_) | Self::AiRequestFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoFile => "NO_FILE",
            Self::MultipleFiles => "MULTIPLE_FILES",
            Self::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::EmptyOrImageOnlyPdf => EMPTY_OR_IMAGE_ONLY_PDF,
            Self::Extraction(_) => "PDF_EXTRACTION_FAILED",
            Self::AiNotConfigured => AI_NOT_CONFIGURED,
            Self::AiResponseUnparseable(_) => AI_RESPONSE_UNPARSEABLE,
            Self::AiRequestFailed(_) => "AI_REQUEST_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Upstream details stay in the logs
            Self::AiResponseUnparseable(_) => {
                "The AI service returned a response that could not be understood".to_string()
            }
            Self::AiRequestFailed(_) => "The AI service could not complete the analysis".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Extraction(_) => "The PDF could not be read".to_string(),
            other => other.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::AiNotConfigured => Some(
                "Set OPENAI_API_KEY on the server, or use demo mode to explore the analysis view"
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl ApiError {
    /// Log this failure against the upload it concerns. Only name and size
    /// are logged, never content.
    pub fn log_failure(&self, file_name: &str, file_size: u64) {
        match self {
            Self::Internal(e) => {
                tracing::error!(file_name, file_size, error = ?e, "Internal server error");
            }
            Self::AiResponseUnparseable(detail) | Self::AiRequestFailed(detail) => {
                tracing::error!(
                    file_name,
                    file_size,
                    code = self.error_code(),
                    detail = %detail,
                    "AI service error"
                );
            }
            _ => {
                tracing::warn!(
                    file_name,
                    file_size,
                    code = self.error_code(),
                    error = %self,
                    "Analysis request rejected"
                );
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message: Some(self.public_message()),
            suggestion: self.suggestion(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

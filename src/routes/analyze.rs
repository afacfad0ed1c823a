//! Proposal analysis endpoint.
//!
//! POST /api/analyze-proposal accepts one PDF in the multipart field `pdf`,
//! extracts its text and asks the language model for a structured summary.

use anyhow::Context;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::app::AppState;
use crate::domain::{AnalysisMetadata, AnalysisResult};
use crate::error::{ApiError, ApiResult};
use crate::middleware::request_id::RequestIdExt;
use crate::services::extractor::{looks_like_pdf, ExtractionError};

/// Multipart field carrying the PDF.
pub const PDF_FIELD: &str = "pdf";

/// A file received in the request, held only for the request's lifetime.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// What is known about the upload so far. Failure logs carry it.
#[derive(Debug, Default)]
struct UploadContext {
    file_name: Option<String>,
    bytes_read: u64,
}

#[instrument(skip_all, fields(file_name = tracing::field::Empty, file_size = tracing::field::Empty))]
pub async fn analyze_proposal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisResult>> {
    let mut upload = UploadContext::default();
    let result = analyze_upload(&state, &headers, multipart, &mut upload).await;

    if let Err(err) = &result {
        err.log_failure(upload.file_name.as_deref().unwrap_or("-"), upload.bytes_read);
    }
    result.map(Json)
}

async fn analyze_upload(
    state: &AppState,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
    context: &mut UploadContext,
) -> ApiResult<AnalysisResult> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_upload(multipart, state.settings.max_upload_bytes, context).await?;

    let file_name = upload.file_name;
    let file_size = upload.bytes.len() as u64;
    tracing::Span::current().record("file_size", file_size);

    // The declared type is only a hint; the signature decides
    if !looks_like_pdf(&upload.bytes) {
        return Err(ApiError::UnsupportedFileType(
            "file content is not a PDF document".to_string(),
        ));
    }

    let extractor = state.extractor.clone();
    let bytes = upload.bytes;
    let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .context("PDF extraction task failed")?
        .map_err(|e| match e {
            ExtractionError::NotPdf => {
                ApiError::UnsupportedFileType("file content is not a PDF document".to_string())
            }
            ExtractionError::Failed(detail) => ApiError::Extraction(detail),
        })?;
    let processed_at = Utc::now();

    if text.trim().is_empty() {
        return Err(ApiError::EmptyOrImageOnlyPdf);
    }
    let text_length = text.chars().count();

    let model = state.model.as_ref().ok_or(ApiError::AiNotConfigured)?;

    let started = Instant::now();
    let analysis = model.analyze(&text, headers.request_id()).await?;

    info!(
        model = model.model_name(),
        text_length,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Proposal analyzed"
    );

    Ok(AnalysisResult::new(
        analysis,
        AnalysisMetadata {
            file_name,
            file_size,
            processed_at,
            text_length,
        },
    ))
}

/// Read the single `pdf` file part, enforcing the size cap while streaming.
async fn read_upload(
    mut multipart: Multipart,
    max_bytes: u64,
    context: &mut UploadContext,
) -> ApiResult<Upload> {
    let mut upload: Option<Upload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }
        // No filename (or an empty one, as browsers send when nothing was
        // chosen) means a plain form value, not a file
        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        if upload.is_some() {
            return Err(ApiError::MultipleFiles);
        }
        tracing::Span::current().record("file_name", file_name.as_str());
        context.file_name = Some(file_name.clone());

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_pdf_media_type(&content_type) {
            return Err(ApiError::UnsupportedFileType(if content_type.is_empty() {
                "no content type declared".to_string()
            } else {
                content_type
            }));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?
        {
            context.bytes_read += chunk.len() as u64;
            if context.bytes_read > max_bytes {
                return Err(ApiError::FileTooLarge {
                    limit_bytes: max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        upload = Some(Upload { file_name, bytes });
    }

    upload.ok_or(ApiError::NoFile)
}

fn multipart_error(err: MultipartError, max_bytes: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge {
            limit_bytes: max_bytes,
        }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn is_pdf_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false)
}

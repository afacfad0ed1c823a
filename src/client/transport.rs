//! Client side of `POST /api/analyze-proposal`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::upload::UploadedFile;
use crate::domain::AnalysisResult;
use crate::error::ErrorResponse;

/// Why a submission did not produce an `AnalysisResult`.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    /// Service unreachable, connection reset, timeout.
    #[error("analysis service unreachable: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("analysis service returned {status}")]
    Status {
        status: StatusCode,
        body: Option<ErrorResponse>,
    },

    /// A success status with a body that is not an `AnalysisResult`.
    #[error("invalid analysis response: {0}")]
    Decode(String),
}

impl TransportFailure {
    /// The service rejected the request itself (bad file, rate limit).
    /// Showing a demo would hide a problem the user has to fix.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if status.is_client_error())
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Status {
                body: Some(body), ..
            } => Some(body.error.as_str()),
            _ => None,
        }
    }

    /// Best human-readable message for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                body: Some(body), ..
            } => body.message.clone().unwrap_or_else(|| body.error.clone()),
            Self::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                "Too many analysis requests, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Submits a file to the analysis service.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn submit(&self, file: &UploadedFile) -> Result<AnalysisResult, TransportFailure>;
}

/// `reqwest` transport against a running analysis service.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = url::Url::parse(base_url)
            .with_context(|| format!("Invalid server URL: {}", base_url))?;
        let endpoint = base
            .join("api/analyze-proposal")
            .context("Failed to build analysis endpoint URL")?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn submit(&self, file: &UploadedFile) -> Result<AnalysisResult, TransportFailure> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| TransportFailure::Network(e.to_string()))?;
        let form = multipart::Form::new().part("pdf", part);

        debug!(endpoint = %self.endpoint, file_name = %file.name, file_size = file.size(), "Submitting proposal");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // 429 and proxies answer in plain text; only JSON bodies are typed
            let body = response.json::<ErrorResponse>().await.ok();
            return Err(TransportFailure::Status { status, body });
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| TransportFailure::Decode(e.to_string()))
    }
}

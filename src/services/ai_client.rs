//! Language-model client for proposal analysis.
//!
//! Talks to any OpenAI-compatible chat-completions API and turns the
//! model's reply into a validated `ProposalAnalysis`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::AiSettings;
use crate::domain::ProposalAnalysis;
use crate::error::ApiError;
use crate::services::prompts;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("response contained no message")]
    EmptyResponse,

    #[error("response is not a valid analysis: {0}")]
    Unparseable(String),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::EmptyResponse | ModelError::Unparseable(_) => {
                ApiError::AiResponseUnparseable(err.to_string())
            }
            ModelError::Request(_) | ModelError::Status { .. } => {
                ApiError::AiRequestFailed(err.to_string())
            }
        }
    }
}

/// Something that can turn proposal text into a structured analysis.
#[async_trait]
pub trait ProposalModel: Send + Sync {
    async fn analyze(
        &self,
        text: &str,
        request_id: Option<&str>,
    ) -> Result<ProposalAnalysis, ModelError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_input_chars: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Error envelope returned by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
struct UpstreamErrorResponse {
    error: UpstreamErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

impl AiClient {
    /// Create a new model client.
    pub fn new(settings: &AiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            max_input_chars: settings.max_input_chars,
        })
    }

    /// Send one chat completion and return the assistant text.
    async fn complete(&self, prompt: &str, request_id: Option<&str>) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req = self.client.post(&url).bearer_auth(&self.api_key);

        if let Some(rid) = request_id {
            req = req.header("x-request-id", rid);
        }

        debug!(url = %url, "AI service request");

        let response = req
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: prompts::SYSTEM_PROMPT,
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt,
                    },
                ],
                max_tokens: self.max_tokens,
                temperature: 0.3,
            })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "AI service request failed");
                ModelError::Request(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<UpstreamErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("AI service error: {}", status));

            if status == StatusCode::UNAUTHORIZED {
                error!("AI service authentication failed");
            }
            return Err(ModelError::Status { status, message });
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to decode AI service response");
            ModelError::Unparseable(e.to_string())
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl ProposalModel for AiClient {
    #[instrument(skip(self, text), fields(model = %self.model, text_chars = text.chars().count()))]
    async fn analyze(
        &self,
        text: &str,
        request_id: Option<&str>,
    ) -> Result<ProposalAnalysis, ModelError> {
        let prompt = prompts::analysis_prompt(text, self.max_input_chars);
        let reply = self.complete(&prompt, request_id).await?;
        parse_analysis(&reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Parse a model reply into a `ProposalAnalysis`.
///
/// Models sometimes wrap the object in a Markdown fence or add a sentence
/// around it; both are stripped before strict parsing.
pub fn parse_analysis(reply: &str) -> Result<ProposalAnalysis, ModelError> {
    let trimmed = reply.trim();

    let unfenced = if trimmed.starts_with("```") {
        trimmed
            .lines()
            .skip(1)
            .take_while(|l| !l.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed.to_string()
    };

    let candidate = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => return Err(ModelError::Unparseable("no JSON object in reply".to_string())),
    };

    serde_json::from_str(candidate).map_err(|e| ModelError::Unparseable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "executiveSummary": "Acme offers a maintenance contract.",
        "keyRequirements": ["Quarterly inspections"],
        "pricingOverview": {
            "totalAmount": "$12,000",
            "breakdown": ["Inspections: $12,000"],
            "paymentTerms": "Quarterly in advance"
        },
        "recommendedNextSteps": ["Confirm start date", "Sign"]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_analysis(VALID).unwrap();
        assert_eq!(analysis.pricing_overview.total_amount, "$12,000");
        assert_eq!(analysis.recommended_next_steps, vec!["Confirm start date", "Sign"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = format!("```json\n{}\n```", VALID);
        assert!(parse_analysis(&reply).is_ok());
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let reply = format!("Here is the analysis:\n{}\nLet me know if you need more.", VALID);
        assert!(parse_analysis(&reply).is_ok());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_analysis("I could not read that proposal.").unwrap_err();
        assert!(matches!(err, ModelError::Unparseable(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_analysis(r#"{"summary": "x", "tags": []}"#).unwrap_err();
        assert!(matches!(err, ModelError::Unparseable(_)));
    }

    #[test]
    fn test_model_errors_map_to_typed_api_errors() {
        let api: ApiError = ModelError::Unparseable("bad".to_string()).into();
        assert_eq!(api.error_code(), "AI_RESPONSE_UNPARSEABLE");

        let api: ApiError = ModelError::EmptyResponse.into();
        assert_eq!(api.error_code(), "AI_RESPONSE_UNPARSEABLE");

        let api: ApiError = ModelError::Request("timeout".to_string()).into();
        assert_eq!(api.error_code(), "AI_REQUEST_FAILED");
    }

    fn unreachable_settings() -> AiSettings {
        AiSettings {
            api_key: "sk-test".to_string(),
            // Port 1 on loopback refuses connections
            base_url: "http://127.0.0.1:1/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 5,
            max_tokens: 1500,
            max_input_chars: 12_000,
        }
    }

    #[test]
    fn test_construction_is_silent() {
        let (logs, _guard) = crate::logging::capture_logs();

        AiClient::new(&unreachable_settings()).unwrap();

        assert!(logs.contents().is_empty(), "{}", logs.contents());
    }

    #[tokio::test]
    async fn test_request_span_counts_characters() {
        let (logs, _guard) = crate::logging::capture_logs();
        let client = AiClient::new(&unreachable_settings()).unwrap();

        let err = client.analyze("Café déjà vu", None).await.unwrap_err();

        assert!(matches!(err, ModelError::Request(_)));
        let output = logs.contents();
        assert!(output.contains("text_chars=12"), "{output}");
    }
}

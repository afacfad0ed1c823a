//! Proposal analysis models.
//!
//! `ProposalAnalysis` is what the language model must return; the service
//! wraps it with provenance metadata to form the `AnalysisResult` sent to
//! callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pricing section of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOverview {
    /// Currency-formatted amount as written in the proposal, e.g. "$45,000".
    pub total_amount: String,
    pub breakdown: Vec<String>,
    pub payment_terms: String,
}

/// Structured analysis produced by the model, without metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalAnalysis {
    pub executive_summary: String,
    pub key_requirements: Vec<String>,
    pub pricing_overview: PricingOverview,
    /// In execution order.
    pub recommended_next_steps: Vec<String>,
}

/// Provenance of an analysis. Not derivable from the analysis itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub processed_at: DateTime<Utc>,
    pub text_length: usize,
}

/// Response body of `POST /api/analyze-proposal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub executive_summary: String,
    pub key_requirements: Vec<String>,
    pub pricing_overview: PricingOverview,
    pub recommended_next_steps: Vec<String>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn new(analysis: ProposalAnalysis, metadata: AnalysisMetadata) -> Self {
        Self {
            executive_summary: analysis.executive_summary,
            key_requirements: analysis.key_requirements,
            pricing_overview: analysis.pricing_overview,
            recommended_next_steps: analysis.recommended_next_steps,
            metadata,
        }
    }
}

/// Response body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub ai_configured: bool,
}

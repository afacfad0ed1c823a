//! Service layer modules for external integrations.
//!
//! Contains the language-model client, PDF text extraction and the
//! per-address rate limiter.

pub mod ai_client;
pub mod extractor;
pub mod prompts;
pub mod rate_limit;

pub use ai_client::{AiClient, ModelError, ProposalModel};
pub use extractor::{ExtractionError, PdfExtractor, TextExtractor};
pub use rate_limit::RateLimiter;

//! Canned analyses shown without a live analysis service.
//!
//! There are two of them on purpose. `demo_result` answers an explicit
//! "show me a demo" request; `fallback_result` stands in when the service
//! could not be reached and is labeled as an offline sample of the user's
//! own file.

use chrono::Utc;

use super::analysis::{AnalysisMetadata, AnalysisResult, PricingOverview};

pub const DEMO_FILE_NAME: &str = "sample-proposal.pdf";
const DEMO_FILE_SIZE: u64 = 245_760;
const DEMO_TEXT_LENGTH: usize = 15_420;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fixed analysis for the explicit demo path.
pub fn demo_result() -> AnalysisResult {
    AnalysisResult {
        executive_summary: "TechCorp Solutions proposes a comprehensive digital transformation \
            initiative to modernize the client's legacy infrastructure and customer-facing \
            systems. The engagement covers cloud migration, a custom CRM build, and staff \
            training over a six-month timeline. The vendor emphasizes measurable efficiency \
            gains and a phased rollout that limits operational disruption. Success depends on \
            timely stakeholder availability and access to existing system documentation."
            .to_string(),
        key_requirements: strings(&[
            "Migrate on-premise servers and databases to a managed cloud platform",
            "Develop a custom CRM with sales pipeline and reporting modules",
            "Integrate the CRM with existing ERP and email marketing tools",
            "Provide role-based training for 50+ staff members",
            "Maintain 99.9% uptime during the migration window",
            "Deliver full technical documentation and admin runbooks",
        ]),
        pricing_overview: PricingOverview {
            total_amount: "$185,000".to_string(),
            breakdown: strings(&[
                "Cloud migration and infrastructure setup: $65,000",
                "Custom CRM development: $80,000",
                "Systems integration: $22,000",
                "Training and documentation: $12,000",
                "Project management: $6,000",
            ]),
            payment_terms: "30% upon contract signing, 40% at CRM beta delivery, 30% upon final \
                acceptance. Net 30 payment terms."
                .to_string(),
        },
        recommended_next_steps: strings(&[
            "Schedule a technical review session with the vendor's solution architect",
            "Request references from two clients with comparable migrations",
            "Confirm data residency and security compliance requirements",
            "Negotiate milestone acceptance criteria before signing",
            "Identify internal project owner and stakeholder availability",
        ]),
        metadata: AnalysisMetadata {
            file_name: DEMO_FILE_NAME.to_string(),
            file_size: DEMO_FILE_SIZE,
            processed_at: Utc::now(),
            text_length: DEMO_TEXT_LENGTH,
        },
    }
}

/// Offline stand-in for a file the service could not analyze.
///
/// Content is fixed apart from the metadata, which echoes the file so the
/// user can tell which upload the sample replaced.
pub fn fallback_result(file_name: &str, file_size: u64) -> AnalysisResult {
    AnalysisResult {
        executive_summary: format!(
            "This is a sample analysis shown because the analysis service could not be \
             reached for \"{}\". A typical proposal of this kind outlines a professional \
             services engagement with defined deliverables and a fixed timeline. Pricing is \
             usually milestone-based with standard payment terms. Re-run the analysis once \
             the service is available to see results for this document.",
            file_name
        ),
        key_requirements: strings(&[
            "Define project scope and deliverables",
            "Agree on timeline and milestones",
            "Assign points of contact on both sides",
            "Establish acceptance criteria",
        ]),
        pricing_overview: PricingOverview {
            total_amount: "$50,000".to_string(),
            breakdown: strings(&[
                "Discovery and planning: $10,000",
                "Implementation: $30,000",
                "Testing and handover: $10,000",
            ]),
            payment_terms: "50% upfront, 50% upon completion".to_string(),
        },
        recommended_next_steps: strings(&[
            "Retry the analysis when the service is available",
            "Review the proposal's scope section manually",
            "Clarify pricing assumptions with the vendor",
        ]),
        metadata: AnalysisMetadata {
            file_name: file_name.to_string(),
            file_size,
            processed_at: Utc::now(),
            text_length: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_and_fallback_payloads_differ() {
        let demo = demo_result();
        let fallback = fallback_result(DEMO_FILE_NAME, DEMO_FILE_SIZE);
        assert_ne!(demo.executive_summary, fallback.executive_summary);
        assert_ne!(demo.pricing_overview, fallback.pricing_overview);
    }

    #[test]
    fn test_fallback_echoes_file() {
        let fallback = fallback_result("acme-bid.pdf", 1234);
        assert_eq!(fallback.metadata.file_name, "acme-bid.pdf");
        assert_eq!(fallback.metadata.file_size, 1234);
        assert!(fallback.executive_summary.contains("acme-bid.pdf"));
    }

    #[test]
    fn test_demo_content_is_stable() {
        let a = demo_result();
        let b = demo_result();
        assert_eq!(a.key_requirements, b.key_requirements);
        assert_eq!(a.pricing_overview, b.pricing_overview);
        assert_eq!(a.metadata.file_name, DEMO_FILE_NAME);
    }
}

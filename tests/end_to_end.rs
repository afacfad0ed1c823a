//! Drives the real router over TCP with the real HTTP transport.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use proposal_intake::app::{create_app, AppState};
use proposal_intake::client::{
    AnalysisSession, HttpTransport, LifecycleState, NoticeLevel, Notifier, TerminalEvent, Timing,
    UploadCandidate,
};
use proposal_intake::config::Settings;
use proposal_intake::domain::{demo, HealthResponse, PricingOverview, ProposalAnalysis};
use proposal_intake::services::{ExtractionError, ModelError, ProposalModel, TextExtractor};

struct StaticExtractor(&'static str);

impl TextExtractor for StaticExtractor {
    fn extract_text(&self, _pdf: &[u8]) -> Result<String, ExtractionError> {
        Ok(self.0.to_string())
    }
}

struct StaticModel;

#[async_trait]
impl ProposalModel for StaticModel {
    async fn analyze(
        &self,
        text: &str,
        _request_id: Option<&str>,
    ) -> Result<ProposalAnalysis, ModelError> {
        Ok(ProposalAnalysis {
            executive_summary: format!("Summary of: {}", text),
            key_requirements: vec!["Deliver on time".to_string()],
            pricing_overview: PricingOverview {
                total_amount: "$12,500".to_string(),
                breakdown: vec!["Labor: $12,500".to_string()],
                payment_terms: "Net 30".to_string(),
            },
            recommended_next_steps: vec!["Sign".to_string()],
        })
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

struct Quiet;

impl Notifier for Quiet {
    fn notify(&self, _level: NoticeLevel, _message: &str) {}
}

async fn spawn_server(
    extractor: Arc<dyn TextExtractor>,
    model: Option<Arc<dyn ProposalModel>>,
) -> SocketAddr {
    let state = AppState::new(Settings::default(), extractor, model);
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

fn session_for(addr: SocketAddr) -> AnalysisSession {
    let transport =
        HttpTransport::new(&format!("http://{}", addr), Duration::from_secs(10)).unwrap();
    AnalysisSession::new(Arc::new(transport), Arc::new(Quiet), Timing::immediate())
}

fn proposal() -> UploadCandidate {
    UploadCandidate::from_name("bid.pdf", b"%PDF-1.4\n% test proposal\n".to_vec())
}

#[tokio::test]
async fn test_upload_is_analyzed() {
    let addr = spawn_server(
        Arc::new(StaticExtractor("Build a bridge")),
        Some(Arc::new(StaticModel)),
    )
    .await;
    let session = session_for(addr);

    let event = session.upload(proposal()).await.unwrap();

    let TerminalEvent::Succeeded(result) = event else {
        panic!("unexpected event: {event:?}");
    };
    assert_eq!(result.executive_summary, "Summary of: Build a bridge");
    assert_eq!(result.metadata.file_name, "bid.pdf");
    assert_eq!(result.metadata.file_size, 25);
    assert_eq!(result.metadata.text_length, 14);
}

#[tokio::test]
async fn test_unconfigured_model_falls_back_to_sample() {
    let addr = spawn_server(Arc::new(StaticExtractor("Build a bridge")), None).await;
    let session = session_for(addr);

    let event = session.upload(proposal()).await.unwrap();

    assert!(matches!(event, TerminalEvent::FailedOverToDemo(_)));
    assert!(matches!(session.state(), LifecycleState::FailedOverToDemo(_)));
    let result = session.state().result().cloned().unwrap();
    assert_eq!(result.metadata.file_name, "bid.pdf");
    assert_eq!(
        result.pricing_overview,
        demo::fallback_result("bid.pdf", 25).pricing_overview
    );
}

#[tokio::test]
async fn test_image_only_pdf_is_an_error() {
    let addr = spawn_server(Arc::new(StaticExtractor("  \n ")), Some(Arc::new(StaticModel))).await;
    let session = session_for(addr);

    let event = session.upload(proposal()).await.unwrap();

    assert!(matches!(event, TerminalEvent::Errored(_)));
    assert!(session.state().result().is_none());
}

#[tokio::test]
async fn test_unreachable_service_falls_back_to_sample() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let session = session_for(addr);

    let event = session.upload(proposal()).await.unwrap();

    assert!(matches!(event, TerminalEvent::FailedOverToDemo(_)));
}

#[tokio::test]
async fn test_health_reports_model_configuration() {
    let addr = spawn_server(Arc::new(StaticExtractor("")), None).await;

    let health: HealthResponse = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health.status, "OK");
    assert!(!health.ai_configured);
}

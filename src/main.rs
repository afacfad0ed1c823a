use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use proposal_intake::services::{AiClient, PdfExtractor, ProposalModel};
use proposal_intake::{app, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        max_upload_bytes = settings.max_upload_bytes,
        "Starting proposal intake service"
    );

    // Create model client, if a credential is configured
    let model: Option<Arc<dyn ProposalModel>> = match &settings.ai {
        Some(ai) => {
            let client = AiClient::new(ai)?;
            tracing::info!(model = %client.model_name(), base_url = %ai.base_url, "AI client initialized");
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("No AI API key configured - analysis requests will return AI_NOT_CONFIGURED");
            None
        }
    };

    // Create application state
    let state = app::AppState::new(settings.clone(), Arc::new(PdfExtractor), model);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

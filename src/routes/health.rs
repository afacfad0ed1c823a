use axum::{extract::State, Json};
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::HealthResponse;

/// Health check endpoint - public
///
/// Always `OK` while the process serves requests; `aiConfigured` tells
/// clients whether analysis will run or be refused with `AI_NOT_CONFIGURED`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai_configured = state.model.is_some();

    Json(HealthResponse {
        status: "OK".to_string(),
        message: if ai_configured {
            "Proposal analysis service is running".to_string()
        } else {
            "Proposal analysis service is running without AI (demo mode only)".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        ai_configured,
    })
}

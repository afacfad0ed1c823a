pub mod analyze;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::middleware::limit_by_client_addr;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the API router, mounted under `/api`
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let body_limit = usize::try_from(state.settings.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Analysis (rate limited per client address)
        .route(
            "/analyze-proposal",
            post(analyze::analyze_proposal)
                .layer(DefaultBodyLimit::max(body_limit))
                .route_layer(from_fn_with_state(state, limit_by_client_addr)),
        )
}

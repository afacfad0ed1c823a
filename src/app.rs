use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Settings;
use crate::error::ErrorResponse;
use crate::middleware::request_id::{request_id_layer, X_REQUEST_ID};
use crate::routes;
use crate::services::{ProposalModel, RateLimiter, TextExtractor};

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub extractor: Arc<dyn TextExtractor>,
    /// `None` when no model credential is configured.
    pub model: Option<Arc<dyn ProposalModel>>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        settings: Settings,
        extractor: Arc<dyn TextExtractor>,
        model: Option<Arc<dyn ProposalModel>>,
    ) -> Arc<Self> {
        let rate_limiter = RateLimiter::new(
            settings.rate_limit_max_requests,
            Duration::from_secs(settings.rate_limit_window_seconds),
        );

        Arc::new(Self {
            settings,
            extractor,
            model,
            rate_limiter,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Spans at DEBUG so INFO stays quiet per request
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .nest("/api", routes::api_router(state.clone()))
        .fallback(not_found)
        // Middleware stack (applied bottom-up)
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "NOT_FOUND".to_string(),
            message: Some(format!("No route for {}", uri.path())),
            suggestion: None,
        }),
    )
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    // "*" opens the API to any origin (local tooling, demos)
    let allow_origin = if settings.cors_allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = settings
            .cors_allow_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    let max_age = if settings.env.is_dev() {
        Duration::from_secs(86400)
    } else {
        Duration::from_secs(3600)
    };

    let request_id = HeaderName::from_static(X_REQUEST_ID);

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            request_id.clone(),
        ]))
        .expose_headers([request_id, header::RETRY_AFTER])
        .max_age(max_age)
}

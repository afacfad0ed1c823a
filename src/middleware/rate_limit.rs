//! Per-client rate limiting for the analysis route.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::app::AppState;

pub const RATE_LIMIT_MESSAGE: &str =
    "Too many analysis requests from this address, please try again later.";

/// Reject requests over the configured per-address budget with 429.
pub async fn limit_by_client_addr(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Response {
    let addr = client_addr(
        req.headers(),
        connect_info.map(|ConnectInfo(addr)| addr),
        state.settings.trust_proxy,
    );

    match state.rate_limiter.check(addr) {
        Ok(()) => next.run(req).await,
        Err(limited) => {
            tracing::warn!(
                client = %addr,
                max_requests = state.rate_limiter.max_requests(),
                "Rate limit exceeded"
            );
            let retry_after = limited.retry_after.as_secs().max(1).to_string();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after)],
                RATE_LIMIT_MESSAGE,
            )
                .into_response()
        }
    }
}

/// Resolve the address a request is accounted against.
///
/// `X-Forwarded-For` is honored only when the server sits behind a trusted
/// proxy. Requests with no known address share one bucket.
fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    peer.map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([192, 168, 1, 5], 40000)))
    }

    #[test]
    fn test_peer_address_used_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(
            client_addr(&headers, peer(), false),
            IpAddr::from([192, 168, 1, 5])
        );
    }

    #[test]
    fn test_forwarded_for_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(
            client_addr(&headers, peer(), true),
            IpAddr::from([203, 0, 113, 9])
        );
    }

    #[test]
    fn test_garbage_forwarded_for_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(
            client_addr(&headers, peer(), true),
            IpAddr::from([192, 168, 1, 5])
        );
        assert_eq!(
            client_addr(&HeaderMap::new(), None, true),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }
}

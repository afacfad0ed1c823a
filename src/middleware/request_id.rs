//! Request IDs: assigned on the way in, echoed on the way out, and forwarded
//! to the model provider so one upload can be traced end to end.

use axum::http::{HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Layers that keep a caller's `x-request-id` or mint a UUID v4, and copy
/// it onto the response.
pub fn request_id_layer() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header_name = HeaderName::from_static(X_REQUEST_ID);

    (
        SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid),
        PropagateRequestIdLayer::new(header_name),
    )
}

pub trait RequestIdExt {
    /// The request ID, if it is short printable ASCII. Anything else is not
    /// worth forwarding upstream or writing to logs.
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> Option<&str> {
        let id = self.get(X_REQUEST_ID)?.to_str().ok()?.trim();
        let well_formed = !id.is_empty()
            && id.len() <= MAX_REQUEST_ID_LEN
            && id.bytes().all(|b| b.is_ascii_graphic());
        well_formed.then_some(id)
    }
}

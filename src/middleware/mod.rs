//! HTTP middleware: request IDs and per-client rate limiting.

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::limit_by_client_addr;
pub use request_id::request_id_layer;

//! Proposal intake: a PDF analysis service and the client that drives it.

pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;

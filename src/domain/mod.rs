//! Domain types and DTOs shared by the analysis service and its client.

pub mod analysis;
pub mod demo;

pub use analysis::*;

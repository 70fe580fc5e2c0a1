//! Grading relay library.
//!
//! Two halves joined by the network:
//! - the edge relay (`http`) that forwards browser calls to the grading
//!   backend, streaming event streams and buffering everything else;
//! - the grading consumer (`grading`) that follows one submission's live
//!   output and resolves it to a final record.

pub mod config;
pub mod grading;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

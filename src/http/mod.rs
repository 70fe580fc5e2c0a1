//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client request under {route_prefix}/
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → proxy.rs (path rewrite, header allowlist, upstream call)
//!     → response.rs (redirect → 401, event stream or buffered)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{AppState, Forwarder};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{ProxyError, EVENT_STREAM};
pub use server::HttpServer;

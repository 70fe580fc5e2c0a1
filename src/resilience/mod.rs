//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Event stream drops or fails to connect:
//!     → reconnect.rs (policy decides whether and when to retry)
//!     → backoff.rs (exponential delay with jitter)
//! ```
//!
//! # Design Decisions
//! - The relay itself never retries; only the grading consumer reconnects
//! - Reconnection is an explicit strategy object owned by the consumer
//! - A server-sent `retry` hint overrides the computed delay

pub mod backoff;
pub mod reconnect;

pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectPolicy};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! Draining waits for open connections, relayed event streams included:
//! the server exits once the backend has ended each stream.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

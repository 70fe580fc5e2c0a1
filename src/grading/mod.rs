//! Grading stream consumer.
//!
//! # Data Flow
//! ```text
//! ApiClient::submit_solution → submission id
//!     → Observation::start(StreamObserver | PollObserver, id)
//!         stream: sse.rs frames → event.rs typed events
//!         poll:   fetch_submission every interval → Snapshot / Complete
//!     → GradingSession::apply (line.rs classification, status.rs state machine)
//!     → completion callback with the final Submission
//! ```
//!
//! # Design Decisions
//! - One observation, one connection, one session per submission
//! - Malformed payloads are logged and dropped, never fatal
//! - Reconnection belongs to the consumer (see `resilience::reconnect`)

pub mod client;
pub mod event;
pub mod line;
pub mod observer;
pub mod poll;
pub mod scroll;
pub mod session;
pub mod sse;
pub mod status;
pub mod stream;
pub mod submission;

pub use client::{ApiClient, ClientError};
pub use event::{GradingEvent, StatusReport};
pub use line::{LineCategory, LogLine};
pub use observer::{ObserveError, Observation, OutcomeObserver};
pub use poll::PollObserver;
pub use scroll::{ScrollFollower, Viewport};
pub use session::{Applied, GradingSession};
pub use status::{StatusTracker, StreamState, SubmissionStatus};
pub use stream::StreamObserver;
pub use submission::Submission;

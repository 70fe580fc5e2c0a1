//! Typed grading events.
//!
//! Stream frames carry untyped payloads. They are decoded here into
//! [`GradingEvent`] variants with an explicit failure outcome; callers log
//! and drop failures instead of acting on them.

use serde::Deserialize;
use thiserror::Error;

use crate::grading::sse::SseFrame;
use crate::grading::status::SubmissionStatus;
use crate::grading::submission::Submission;

/// Event names emitted by the grading backend.
pub mod names {
    pub const LOG: &str = "log";
    pub const STATUS: &str = "status";
    pub const COMPLETE: &str = "complete";
    pub const ERROR: &str = "error";
}

/// Something the session can act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingEvent {
    /// Raw log text, possibly several newline-joined lines.
    Log(String),
    /// Backend status report.
    Status(StatusReport),
    /// Final record; the observation ends after it.
    Complete(Box<Submission>),
    /// A non-terminal copy of the record (poll mode).
    Snapshot(Box<Submission>),
    /// Server-reported problem, e.g. an unknown submission.
    Fault(String),
}

/// Payload of a `status` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusReport {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FaultPayload {
    message: String,
}

/// Why a frame could not become an event.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed '{event}' payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode a frame. Unknown event names yield `Ok(None)`.
pub fn decode_frame(frame: &SseFrame) -> Result<Option<GradingEvent>, EventDecodeError> {
    let malformed = |source| EventDecodeError::Malformed {
        event: frame.event.clone(),
        source,
    };

    let event = match frame.event.as_str() {
        names::LOG => GradingEvent::Log(frame.data.clone()),
        names::STATUS => {
            GradingEvent::Status(serde_json::from_str(&frame.data).map_err(malformed)?)
        }
        names::COMPLETE => GradingEvent::Complete(Box::new(
            serde_json::from_str(&frame.data).map_err(malformed)?,
        )),
        names::ERROR => {
            let payload: FaultPayload = serde_json::from_str(&frame.data).map_err(malformed)?;
            GradingEvent::Fault(payload.message)
        }
        other => {
            tracing::debug!(event = %other, "Ignoring unknown grading event");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

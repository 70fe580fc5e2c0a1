//! Submission status and the client-side state machine.
//!
//! ```text
//! Connecting → {Pending | Running}* → exactly one of {Passed, Failed, Error}
//! ```
//!
//! Nothing leads back to `Connecting`, and a terminal state never changes.

use serde::{Deserialize, Serialize};

/// Status reported by the backend for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Error,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Passed | SubmissionStatus::Failed | SubmissionStatus::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Running => "running",
            SubmissionStatus::Passed => "passed",
            SubmissionStatus::Failed => "failed",
            SubmissionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-observed state of a grading stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Connecting,
    Reported(SubmissionStatus),
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Reported(s) if s.is_terminal())
    }

    /// Human label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            StreamState::Connecting => "Connecting...",
            StreamState::Reported(SubmissionStatus::Pending) => "Queued",
            StreamState::Reported(SubmissionStatus::Running) => "Running Tests",
            StreamState::Reported(SubmissionStatus::Passed) => "Passed",
            StreamState::Reported(SubmissionStatus::Failed) => "Failed",
            StreamState::Reported(SubmissionStatus::Error) => "Error",
        }
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamState::Connecting => f.write_str("connecting"),
            StreamState::Reported(status) => status.fmt(f),
        }
    }
}

/// Tracks the state machine for one submission.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    state: StreamState,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            state: StreamState::Connecting,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Apply a reported status. Returns false when the tracker is already
    /// terminal and the report was ignored.
    pub fn advance(&mut self, next: SubmissionStatus) -> bool {
        if self.state.is_terminal() {
            tracing::debug!(current = %self.state, ignored = %next, "Status after terminal state ignored");
            return false;
        }
        self.state = StreamState::Reported(next);
        true
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_connecting() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.state(), StreamState::Connecting);
        assert!(!tracker.state().is_terminal());
    }

    #[test]
    fn non_terminal_states_repeat_in_any_order() {
        let mut tracker = StatusTracker::new();
        for status in [
            SubmissionStatus::Running,
            SubmissionStatus::Pending,
            SubmissionStatus::Running,
            SubmissionStatus::Running,
        ] {
            assert!(tracker.advance(status));
        }
        assert_eq!(tracker.state(), StreamState::Reported(SubmissionStatus::Running));
    }

    #[test]
    fn terminal_state_is_final() {
        let mut tracker = StatusTracker::new();
        assert!(tracker.advance(SubmissionStatus::Failed));
        assert!(!tracker.advance(SubmissionStatus::Passed));
        assert!(!tracker.advance(SubmissionStatus::Running));
        assert_eq!(tracker.state(), StreamState::Reported(SubmissionStatus::Failed));
    }

    #[test]
    fn status_tokens_are_lowercase() {
        let parsed: SubmissionStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(parsed, SubmissionStatus::Running);
        assert!(serde_json::from_str::<SubmissionStatus>("\"queued\"").is_err());
        assert_eq!(StreamState::Connecting.to_string(), "connecting");
    }
}

//! Grading session: the consumer side of one submission.
//!
//! Owns the ordered line sequence, the status state machine, the scroll
//! policy and the final outcome. Lines and state are only mutated through
//! [`GradingSession::apply`]; a new submission gets a new session.

use std::ops::Range;

use crate::grading::event::GradingEvent;
use crate::grading::line::{split_fragments, LineCategory, LogLine};
use crate::grading::observer::{ObserveError, Observation};
use crate::grading::scroll::{ScrollFollower, Viewport};
use crate::grading::status::{StatusTracker, StreamState};
use crate::grading::submission::Submission;

type CompletionHook = Box<dyn FnOnce(&Submission) + Send>;

/// What one applied event changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    /// Indices of lines appended by this event.
    pub appended: Range<usize>,
    pub state_changed: bool,
    pub completed: bool,
}

pub struct GradingSession {
    submission_id: String,
    tracker: StatusTracker,
    lines: Vec<LogLine>,
    follower: ScrollFollower,
    score: Option<f64>,
    latest: Option<Submission>,
    outcome: Option<Submission>,
    on_complete: Option<CompletionHook>,
}

impl GradingSession {
    pub fn new(submission_id: impl Into<String>, scroll_threshold_px: u32) -> Self {
        Self {
            submission_id: submission_id.into(),
            tracker: StatusTracker::new(),
            lines: Vec::new(),
            follower: ScrollFollower::new(scroll_threshold_px),
            score: None,
            latest: None,
            outcome: None,
            on_complete: None,
        }
    }

    /// Register the callback that receives the final record, once.
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Submission) + Send + 'static,
    {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    pub fn state(&self) -> StreamState {
        self.tracker.state()
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Latest score seen in a status report or record.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Most recent record, polled or final.
    pub fn latest(&self) -> Option<&Submission> {
        self.latest.as_ref()
    }

    pub fn outcome(&self) -> Option<&Submission> {
        self.outcome.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record a user scroll on the log view.
    pub fn on_user_scroll(&mut self, viewport: Viewport) {
        self.follower.on_user_scroll(viewport);
    }

    /// Offset to scroll to after lines were appended, if still following.
    pub fn autoscroll(&self, viewport: Viewport) -> Option<u32> {
        self.follower.on_append(viewport)
    }

    /// Apply one event in receipt order.
    pub fn apply(&mut self, event: GradingEvent) -> Applied {
        let start = self.lines.len();
        let mut applied = Applied {
            appended: start..start,
            ..Applied::default()
        };

        if self.is_complete() {
            tracing::debug!(submission_id = %self.submission_id, "Event after completion ignored");
            return applied;
        }

        match event {
            GradingEvent::Log(payload) => {
                self.lines.extend(split_fragments(&payload).map(LogLine::classify));
            }
            GradingEvent::Status(report) => {
                applied.state_changed = self.tracker.advance(report.status);
                if applied.state_changed && report.score.is_some() {
                    self.score = report.score;
                }
            }
            GradingEvent::Snapshot(record) => {
                applied.state_changed = self.tracker.advance(record.status);
                if record.score.is_some() {
                    self.score = record.score;
                }
                self.latest = Some(*record);
            }
            GradingEvent::Complete(record) => {
                applied.state_changed = self.tracker.advance(record.status);
                if record.score.is_some() {
                    self.score = record.score;
                }
                tracing::info!(
                    submission_id = %self.submission_id,
                    status = %record.status,
                    score = ?record.score,
                    "Grading complete"
                );
                if let Some(hook) = self.on_complete.take() {
                    hook(record.as_ref());
                }
                self.latest = Some((*record).clone());
                self.outcome = Some(*record);
                applied.completed = true;
            }
            GradingEvent::Fault(message) => {
                tracing::warn!(submission_id = %self.submission_id, message = %message, "Grading service reported a fault");
                self.lines.push(LogLine::new(LineCategory::Error, message));
            }
        }

        applied.appended = start..self.lines.len();
        applied
    }

    /// Drive `observation` until the final record arrives. `on_update` runs
    /// after every applied event. The observation is stopped on return.
    pub async fn follow<F>(
        &mut self,
        mut observation: Observation,
        mut on_update: F,
    ) -> Result<Submission, ObserveError>
    where
        F: FnMut(&GradingSession, &Applied),
    {
        while let Some(event) = observation.next().await {
            let applied = self.apply(event);
            on_update(self, &applied);
            if applied.completed {
                observation.stop();
                break;
            }
        }

        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        observation.finish().await?;
        Err(ObserveError::Incomplete)
    }
}

impl std::fmt::Debug for GradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradingSession")
            .field("submission_id", &self.submission_id)
            .field("state", &self.tracker.state())
            .field("lines", &self.lines.len())
            .field("complete", &self.is_complete())
            .finish()
    }
}

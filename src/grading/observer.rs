//! Submission outcome observers.
//!
//! An [`OutcomeObserver`] watches one submission and pushes
//! [`GradingEvent`]s until it sees a final record. The live event-stream
//! observer and the polling fallback both implement it, so a caller can
//! swap one for the other without touching the consuming session.
//!
//! ```text
//! Observation::start(observer, id)
//!     → spawned task runs observer.observe(id, tx, cancel)
//!     → updates flow through an unbounded channel (the reader never stalls)
//!     → stop() / drop cancels the task and releases its connection
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::grading::client::ClientError;
use crate::grading::event::GradingEvent;

/// Sending half handed to observers.
pub type UpdateSender = mpsc::UnboundedSender<GradingEvent>;

/// Why an observation ended without a final record.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("{0}")]
    Rejected(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("observation ended before a final result")]
    Incomplete,

    #[error("observer task failed: {0}")]
    Task(String),
}

impl From<ClientError> for ObserveError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::AuthenticationRequired => ObserveError::AuthenticationRequired,
            ClientError::Rejected { message, .. } => ObserveError::Rejected(message),
            other => ObserveError::Transport(other.to_string()),
        }
    }
}

/// Watches a submission until its outcome is known.
#[async_trait]
pub trait OutcomeObserver: Send + Sync + 'static {
    /// Short name for logs ("stream", "poll").
    fn mode(&self) -> &'static str;

    /// Push updates for `submission_id` into `updates`. Returns after a
    /// `Complete` event was sent, when the receiver is gone, or when
    /// `cancel` fires.
    async fn observe(
        &self,
        submission_id: &str,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(), ObserveError>;
}

/// A running observation. Dropping it stops the observer.
pub struct Observation {
    submission_id: String,
    updates: mpsc::UnboundedReceiver<GradingEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<(), ObserveError>>>,
}

impl Observation {
    /// Spawn `observer` for one submission. Each call gets its own task and
    /// connection; nothing is shared with earlier observations.
    pub fn start<O>(observer: Arc<O>, submission_id: &str) -> Self
    where
        O: OutcomeObserver + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let id = submission_id.to_string();
        let token = cancel.clone();

        tracing::info!(submission_id = %id, mode = observer.mode(), "Observing submission");
        let task = tokio::spawn(async move { observer.observe(&id, tx, token).await });

        Self {
            submission_id: submission_id.to_string(),
            updates: rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// Next update in receipt order; `None` once the observer has ended.
    pub async fn next(&mut self) -> Option<GradingEvent> {
        self.updates.recv().await
    }

    /// Cancel the observer and release its connection.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(submission_id = %self.submission_id, "Stopping observation");
            self.cancel.cancel();
        }
    }

    /// Wait for the observer task and return how it ended.
    pub async fn finish(mut self) -> Result<(), ObserveError> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| ObserveError::Task(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

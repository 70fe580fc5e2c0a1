//! Polling fallback observer.
//!
//! Fetches the submission record on a fixed interval while it is not
//! terminal. No live log lines are available in this mode; each poll
//! replaces the local copy. Polling stops as soon as a terminal status is
//! seen, with no further request.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::grading::client::ApiClient;
use crate::grading::event::GradingEvent;
use crate::grading::observer::{ObserveError, OutcomeObserver, UpdateSender};

#[derive(Debug, Clone)]
pub struct PollObserver {
    client: ApiClient,
    interval: Duration,
}

impl PollObserver {
    pub fn new(client: ApiClient, interval: Duration) -> Self {
        Self { client, interval }
    }
}

#[async_trait]
impl OutcomeObserver for PollObserver {
    fn mode(&self) -> &'static str {
        "poll"
    }

    async fn observe(
        &self,
        submission_id: &str,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(), ObserveError> {
        loop {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                fetched = self.client.fetch_submission(submission_id) => fetched,
            };

            match fetched {
                Ok(submission) if submission.is_terminal() => {
                    tracing::info!(submission_id = %submission_id, status = %submission.status, "Polling finished");
                    let _ = updates.send(GradingEvent::Complete(Box::new(submission)));
                    return Ok(());
                }
                Ok(submission) => {
                    tracing::debug!(submission_id = %submission_id, status = %submission.status, "Polled submission");
                    if updates.send(GradingEvent::Snapshot(Box::new(submission))).is_err() {
                        return Ok(());
                    }
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(submission_id = %submission_id, error = %e, "Poll failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

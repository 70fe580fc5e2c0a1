//! Live observer over the grading event stream.
//!
//! Opens `GET {base}/submissions/{id}/stream`, decodes frames as they
//! arrive and forwards typed events. A dropped or failed connection is
//! reopened according to the [`ReconnectPolicy`]; only a `complete` event,
//! a server `error` event, cancellation, an authentication failure or an
//! exhausted policy end it. The attempt count restarts only after a
//! connection carried grading progress (`log` or `status`).

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::grading::client::{ApiClient, ClientError};
use crate::grading::event::{decode_frame, GradingEvent};
use crate::grading::observer::{ObserveError, OutcomeObserver, UpdateSender};
use crate::grading::sse::SseCodec;
use crate::resilience::ReconnectPolicy;

#[derive(Debug, Default)]
struct Cursor {
    last_event_id: Option<String>,
    retry_hint: Option<Duration>,
    /// A `log` or `status` event arrived on the current connection.
    progressed: bool,
}

enum ConnectionEnd {
    Completed,
    ReceiverGone,
    /// The server reported a fault for this submission.
    Rejected(String),
    Dropped(String),
}

/// Event-stream observer.
#[derive(Debug, Clone)]
pub struct StreamObserver {
    client: ApiClient,
    policy: Arc<dyn ReconnectPolicy>,
}

impl StreamObserver {
    pub fn new(client: ApiClient, policy: Arc<dyn ReconnectPolicy>) -> Self {
        Self { client, policy }
    }

    async fn run_connection(
        &self,
        submission_id: &str,
        updates: &UpdateSender,
        cursor: &mut Cursor,
    ) -> Result<ConnectionEnd, ClientError> {
        let response = self
            .client
            .open_stream(submission_id, cursor.last_event_id.as_deref())
            .await?;
        tracing::info!(submission_id = %submission_id, "Grading stream connected");

        let body = Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other)));
        let mut frames = FramedRead::new(StreamReader::new(body), SseCodec::new());

        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => return Ok(ConnectionEnd::Dropped(e.to_string())),
            };
            if frame.id.is_some() {
                cursor.last_event_id = frame.id.clone();
            }
            if frame.retry.is_some() {
                cursor.retry_hint = frame.retry;
            }

            match decode_frame(&frame) {
                Ok(Some(event)) => {
                    let end = match &event {
                        GradingEvent::Complete(_) => Some(ConnectionEnd::Completed),
                        GradingEvent::Fault(message) => Some(ConnectionEnd::Rejected(message.clone())),
                        GradingEvent::Log(_) | GradingEvent::Status(_) => {
                            cursor.progressed = true;
                            None
                        }
                        GradingEvent::Snapshot(_) => None,
                    };
                    if updates.send(event).is_err() {
                        return Ok(ConnectionEnd::ReceiverGone);
                    }
                    if let Some(end) = end {
                        return Ok(end);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(submission_id = %submission_id, error = %e, "Discarding malformed grading event");
                }
            }
        }

        Ok(ConnectionEnd::Dropped("stream closed by server".to_string()))
    }
}

#[async_trait]
impl OutcomeObserver for StreamObserver {
    fn mode(&self) -> &'static str {
        "stream"
    }

    async fn observe(
        &self,
        submission_id: &str,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(), ObserveError> {
        let mut cursor = Cursor::default();
        let mut attempt: u32 = 0;

        loop {
            cursor.progressed = false;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.run_connection(submission_id, &updates, &mut cursor) => outcome,
            };

            let reason = match outcome {
                Ok(ConnectionEnd::Completed) => {
                    tracing::info!(submission_id = %submission_id, "Grading stream complete");
                    return Ok(());
                }
                Ok(ConnectionEnd::ReceiverGone) => return Ok(()),
                Ok(ConnectionEnd::Rejected(message)) => {
                    tracing::warn!(submission_id = %submission_id, message = %message, "Grading stream rejected by server");
                    return Err(ObserveError::Rejected(message));
                }
                Ok(ConnectionEnd::Dropped(reason)) => reason,
                Err(e) if e.is_transient() => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            if cursor.progressed {
                attempt = 0;
            }
            attempt += 1;

            let Some(delay) = self.policy.next_delay(attempt, cursor.retry_hint) else {
                tracing::warn!(submission_id = %submission_id, attempts = attempt, reason = %reason, "Giving up on grading stream");
                return Err(ObserveError::Exhausted {
                    attempts: attempt,
                    last: reason,
                });
            };

            tracing::warn!(
                submission_id = %submission_id,
                attempt,
                delay = ?delay,
                reason = %reason,
                "Grading stream interrupted, reconnecting"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

//! Grading consumer in polling mode.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use grading_relay::grading::{
    GradingSession, ObserveError, Observation, PollObserver, StreamState, Submission,
    SubmissionStatus,
};

mod common;

type Script = Arc<(AtomicU32, Vec<Option<&'static str>>)>;

/// Answers the scripted statuses in order; `None` answers 503.
async fn scripted_record(State(script): State<Script>, Path(id): Path<String>) -> Response {
    let n = script.0.fetch_add(1, Ordering::SeqCst) as usize;
    let step = script.1.get(n).or(script.1.last()).copied().flatten();
    match step {
        Some(status) => Json(json!({
            "id": id,
            "challengeId": "c-1",
            "status": status,
            "score": if status == "passed" { Some(100) } else { None },
        }))
        .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn login_redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/login")]).into_response()
}

async fn poll_through_relay(
    router: Router,
    id: &str,
) -> (GradingSession, Result<Submission, ObserveError>, usize) {
    let backend = common::start_mock_backend(router).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let observer = Arc::new(PollObserver::new(
        common::relay_client(relay),
        Duration::from_millis(10),
    ));
    let mut session = GradingSession::new(id, 40);
    let mut updates = 0;

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        session.follow(Observation::start(observer, id), |_, _| updates += 1),
    )
    .await
    .expect("polling did not finish");

    shutdown.trigger();
    (session, outcome, updates)
}

#[tokio::test]
async fn polling_stops_at_first_terminal_record() {
    let script: Script = Arc::new((
        AtomicU32::new(0),
        vec![Some("pending"), Some("running"), Some("running"), Some("passed")],
    ));
    let router = Router::new()
        .route("/api/submissions/{id}", get(scripted_record))
        .with_state(script.clone());

    let (session, outcome, updates) = poll_through_relay(router, "p-1").await;

    let record = outcome.unwrap();
    assert_eq!(record.status, SubmissionStatus::Passed);
    assert_eq!(record.score, Some(100.0));
    assert_eq!(updates, 4);
    assert_eq!(session.state(), StreamState::Reported(SubmissionStatus::Passed));
    assert!(session.lines().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(script.0.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn server_errors_do_not_end_polling() {
    let script: Script = Arc::new((
        AtomicU32::new(0),
        vec![Some("running"), None, Some("failed")],
    ));
    let router = Router::new()
        .route("/api/submissions/{id}", get(scripted_record))
        .with_state(script.clone());

    let (session, outcome, _) = poll_through_relay(router, "p-2").await;

    assert_eq!(outcome.unwrap().status, SubmissionStatus::Failed);
    assert_eq!(session.state(), StreamState::Reported(SubmissionStatus::Failed));
    assert_eq!(script.0.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn login_redirect_ends_polling() {
    let router = Router::new().route("/api/submissions/{id}", get(login_redirect));

    let (session, outcome, updates) = poll_through_relay(router, "p-3").await;

    assert!(matches!(outcome, Err(ObserveError::AuthenticationRequired)));
    assert_eq!(updates, 0);
    assert!(!session.is_complete());
}

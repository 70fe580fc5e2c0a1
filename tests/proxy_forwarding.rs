//! End-to-end tests for the relay in front of a mock backend.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

mod common;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "cookie": header("cookie"),
        "content_type": header("content-type"),
        "authorization": header("authorization"),
        "x_extra": header("x-extra"),
        "x_request_id": header("x-request-id"),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn report() -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, "attachment; filename=\"report.txt\"")
        .header(header::SET_COOKIE, "a=1; Path=/")
        .header(header::SET_COOKIE, "b=2; Path=/")
        .header("x-extra", "internal")
        .body(Body::from("hello"))
        .unwrap()
}

async fn login_redirect() -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, "/login")
        .body(Body::empty())
        .unwrap()
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Submission not found" })))
}

fn backend() -> Router {
    Router::new()
        .route("/api/echo/{*rest}", any(echo))
        .route("/api/report", get(report))
        .route("/api/redirect", any(login_redirect))
        .route("/api/missing", get(missing))
}

#[tokio::test]
async fn forwards_only_allowlisted_request_headers() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let res = reqwest::Client::new()
        .post(format!("http://{relay}/api/backend/echo/submissions"))
        .header("cookie", "SESSION=abc")
        .header("content-type", "application/json")
        .header("authorization", "Bearer leak")
        .header("x-extra", "nope")
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["cookie"], "SESSION=abc");
    assert_eq!(seen["content_type"], "application/json");
    assert_eq!(seen["body"], r#"{"a":1}"#);
    assert!(seen["authorization"].is_null());
    assert!(seen["x_extra"].is_null());
    assert!(seen["x_request_id"].is_null());

    shutdown.trigger();
}

#[tokio::test]
async fn rewrites_path_and_keeps_query() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let res = reqwest::Client::new()
        .get(format!("http://{relay}/api/backend/echo/a%20b/c?x=1&y=two"))
        .header("content-type", "application/json")
        .send()
        .await
        .unwrap();

    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["method"], "GET");
    assert_eq!(seen["path"], "/api/echo/a%20b/c");
    assert_eq!(seen["query"], "x=1&y=two");
    // No body on GET, so no content type either.
    assert!(seen["content_type"].is_null());

    shutdown.trigger();
}

#[tokio::test]
async fn buffered_response_carries_header_subset() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let res = reqwest::get(format!("http://{relay}/api/backend/report"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report.txt\""
    );
    assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    assert!(headers.get("x-extra").is_none());
    assert!(headers.get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), "hello");

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_error_status_is_passed_through() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let res = reqwest::get(format!("http://{relay}/api/backend/missing"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Submission not found");

    shutdown.trigger();
}

#[tokio::test]
async fn redirect_becomes_unauthorized() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    for method in [Method::GET, Method::POST] {
        let res = reqwest::Client::new()
            .request(method, format!("http://{relay}/api/backend/redirect"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().get(header::LOCATION).is_none());
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Authentication required" }));
    }

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let nowhere = common::unused_addr().await;
    let (relay, shutdown) = common::start_default_relay(nowhere).await;

    let res = reqwest::get(format!("http://{relay}/api/backend/submissions/1"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Upstream request failed" }));

    shutdown.trigger();
}

#[tokio::test]
async fn paths_outside_prefix_are_not_relayed() {
    let backend = common::start_mock_backend(backend()).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let res = reqwest::get(format!("http://{relay}/api/echo/x")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let health = reqwest::get(format!("http://{relay}/healthz")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn oversized_request_body_is_rejected() {
    let backend = common::start_mock_backend(backend()).await;
    let mut config = common::relay_config(backend);
    config.limits.max_request_body_bytes = 16;
    let (relay, shutdown) = common::start_relay(config).await;

    let res = reqwest::Client::new()
        .post(format!("http://{relay}/api/backend/echo/big"))
        .body(vec![b'x'; 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    shutdown.trigger();
}

type ChunkFeed = Arc<Mutex<Option<mpsc::Receiver<&'static str>>>>;

async fn live_events(State(feed): State<ChunkFeed>) -> Response {
    let rx = feed.lock().await.take().expect("stream requested twice");
    let chunks = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes())), rx))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header("x-extra", "internal")
        .body(Body::from_stream(chunks))
        .unwrap()
}

async fn read_until(res: &mut reqwest::Response, received: &mut String, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !received.contains(needle) {
            let chunk = res.chunk().await.unwrap().expect("stream ended early");
            received.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    })
    .await
    .expect("timed out waiting for relayed chunk");
}

#[tokio::test]
async fn event_stream_is_relayed_incrementally() {
    let (tx, rx) = mpsc::channel(4);
    let feed: ChunkFeed = Arc::new(Mutex::new(Some(rx)));
    let router = Router::new()
        .route("/api/submissions/{id}/stream", get(live_events))
        .with_state(feed);
    let backend = common::start_mock_backend(router).await;
    let (relay, shutdown) = common::start_default_relay(backend).await;

    let mut res = reqwest::get(format!("http://{relay}/api/backend/submissions/7/stream"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
    assert!(res.headers().get("x-extra").is_none());

    let mut received = String::new();
    tx.send("event: log\ndata: [PHASE] compiling\n\n").await.unwrap();
    read_until(&mut res, &mut received, "compiling").await;
    // The second chunk does not exist yet, so the first arrived on its own.
    assert!(!received.contains("complete"));

    tx.send("event: complete\ndata: {\"id\":\"7\",\"status\":\"passed\"}\n\n")
        .await
        .unwrap();
    read_until(&mut res, &mut received, "complete").await;

    drop(tx);
    let rest = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("stream did not close");
    assert!(rest.unwrap().is_none());

    shutdown.trigger();
}

//! Upstream response shaping.
//!
//! # Responsibilities
//! - Turn any upstream redirect into a 401 (the backend only redirects to login)
//! - Relay event streams without buffering
//! - Buffer everything else and forward a fixed header subset
//! - Map relay failures to JSON error responses
//!
//! # Design Decisions
//! - The declared content type alone picks buffered vs streamed
//! - Buffered responses carry only content-type, content-disposition and set-cookie

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use futures_util::StreamExt;
use hyper::body::Incoming;
use thiserror::Error;

use crate::observability::metrics::{self, ForwardMode, StreamGauge};

/// Content type that selects streaming.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Headers copied from a buffered upstream response.
const BUFFERED_HEADERS: [header::HeaderName; 3] = [
    header::CONTENT_TYPE,
    header::CONTENT_DISPOSITION,
    header::SET_COOKIE,
];

/// Failures the relay reports on its own behalf.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no upstream route for path {0}")]
    NoRoute(String),

    #[error("request body too large or unreadable")]
    RequestBody,

    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    #[error("upstream unreachable: {0}")]
    Unreachable(#[from] hyper_util::client::legacy::Error),

    #[error("upstream body failed: {0}")]
    UpstreamBody(String),

    #[error("authentication required")]
    AuthenticationRequired,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoRoute(_) => StatusCode::NOT_FOUND,
            ProxyError::RequestBody => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unreachable(_) | ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            ProxyError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::NoRoute(_) => "No matching route found",
            ProxyError::RequestBody => "Request body too large",
            ProxyError::InvalidRequest(_) => "Invalid request",
            ProxyError::Unreachable(_) | ProxyError::UpstreamBody(_) => "Upstream request failed",
            ProxyError::AuthenticationRequired => "Authentication required",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

/// A response ready for the client, and how it was produced.
#[derive(Debug)]
pub struct Shaped {
    pub response: Response<Body>,
    pub mode: ForwardMode,
}

/// True when the headers declare an event stream.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains(EVENT_STREAM))
}

/// Decide how an upstream response reaches the client.
pub async fn shape_response(
    upstream: Response<Incoming>,
    max_buffered_bytes: usize,
) -> Result<Shaped, ProxyError> {
    let status = upstream.status();

    if status.is_redirection() {
        tracing::debug!(
            status = %status,
            location = ?upstream.headers().get(header::LOCATION),
            "Upstream redirected, reporting unauthenticated"
        );
        metrics::record_auth_redirect();
        return Err(ProxyError::AuthenticationRequired);
    }

    if is_event_stream(upstream.headers()) {
        return Ok(Shaped {
            response: stream_response(upstream),
            mode: ForwardMode::Streamed,
        });
    }

    let (parts, body) = upstream.into_parts();
    let bytes = axum::body::to_bytes(Body::new(body), max_buffered_bytes)
        .await
        .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = parts.status;
    let headers = response.headers_mut();
    for name in BUFFERED_HEADERS {
        for value in parts.headers.get_all(&name) {
            headers.append(name.clone(), value.clone());
        }
    }

    Ok(Shaped {
        response,
        mode: ForwardMode::Buffered,
    })
}

fn stream_response(upstream: Response<Incoming>) -> Response<Body> {
    let (parts, body) = upstream.into_parts();
    let gauge = StreamGauge::open();

    let chunks = Body::new(body).into_data_stream().map(move |chunk| {
        let _held = &gauge;
        if let Err(e) = &chunk {
            tracing::debug!(error = %e, "Upstream event stream closed with error");
        }
        chunk
    });

    let mut response = Response::new(Body::from_stream(chunks));
    *response.status_mut() = parts.status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

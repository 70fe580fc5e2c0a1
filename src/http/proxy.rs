//! Request forwarding to the grading backend.
//!
//! # Responsibilities
//! - Rewrite `{prefix}/{path}?{query}` to `{base}/api/{path}?{query}`
//! - Copy only allowlisted request headers
//! - Read request bodies for methods that carry one
//! - Issue the upstream call without following redirects, without retries
//!
//! # Data Flow
//! ```text
//! client request
//!     → target_uri (path rewrite, raw encoding kept)
//!     → forward_headers (allowlist)
//!     → hyper client (redirects are never followed)
//!     → response.rs (redirect → 401, stream or buffer)
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, Request, Uri},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::schema::{LimitsConfig, UpstreamConfig};
use crate::http::request::request_id_of;
use crate::http::response::{shape_response, ProxyError, Shaped};
use crate::observability::metrics::{self, ForwardMode};

/// Forwards relay requests to one upstream. Cheap to clone.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    target: Arc<UpstreamTarget>,
}

#[derive(Debug)]
struct UpstreamTarget {
    base: String,
    prefix: String,
    allowlist: Vec<HeaderName>,
    max_request_body: usize,
    max_buffered_response: usize,
}

impl Forwarder {
    /// Build a forwarder from explicit configuration.
    pub fn new(upstream: &UpstreamConfig, limits: &LimitsConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let allowlist = upstream
            .forward_headers
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid header name in allowlist");
                    None
                }
            })
            .collect();

        Self {
            client,
            target: Arc::new(UpstreamTarget {
                base: upstream.base_url.trim_end_matches('/').to_string(),
                prefix: upstream.route_prefix.trim_end_matches('/').to_string(),
                allowlist,
                max_request_body: limits.max_request_body_bytes,
                max_buffered_response: limits.max_buffered_response_bytes,
            }),
        }
    }

    /// Upstream base address this forwarder targets.
    pub fn base(&self) -> &str {
        &self.target.base
    }

    /// Rewrite a relay URI to the upstream URI.
    pub fn target_uri(&self, uri: &Uri) -> Result<Uri, ProxyError> {
        let path = uri.path();
        let suffix = path
            .strip_prefix(self.target.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ProxyError::NoRoute(path.to_string()))?;

        let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
        format!("{}/api/{}{}", self.target.base, suffix, query)
            .parse::<Uri>()
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))
    }

    /// Select the request headers that survive the hop.
    pub fn forward_headers(&self, method: &Method, headers: &HeaderMap) -> HeaderMap {
        let carries_body = carries_body(method);
        let mut forwarded = HeaderMap::new();
        for name in &self.target.allowlist {
            if *name == header::CONTENT_TYPE && !carries_body {
                continue;
            }
            for value in headers.get_all(name) {
                forwarded.append(name.clone(), value.clone());
            }
        }
        forwarded
    }

    /// Forward one request and shape the upstream answer.
    pub async fn forward(&self, request: Request<Body>) -> Result<Shaped, ProxyError> {
        let target = self.target_uri(request.uri())?;
        let (parts, body) = request.into_parts();

        let body = if carries_body(&parts.method) {
            let bytes = axum::body::to_bytes(body, self.target.max_request_body)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "Failed to read request body");
                    ProxyError::RequestBody
                })?;
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let mut upstream_request = Request::builder()
            .method(parts.method.clone())
            .uri(target)
            .body(body)
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
        *upstream_request.headers_mut() = self.forward_headers(&parts.method, &parts.headers);

        let response = self.client.request(upstream_request).await?;
        shape_response(response, self.target.max_buffered_response).await
    }
}

fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Forwarder,
}

/// Relay handler for every method under the route prefix.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id_of(&request).to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        upstream = %state.forwarder.base(),
        "Relaying request"
    );

    match state.forwarder.forward(request).await {
        Ok(shaped) => {
            let status = shaped.response.status();
            metrics::record_request(method.as_str(), status.as_u16(), shaped.mode, start);
            tracing::debug!(
                request_id = %request_id,
                status = %status,
                mode = shaped.mode.as_str(),
                "Upstream responded"
            );
            shaped.response.into_response()
        }
        Err(err) => {
            let status = err.status();
            metrics::record_request(method.as_str(), status.as_u16(), ForwardMode::Rejected, start);
            match &err {
                ProxyError::Unreachable(_) | ProxyError::UpstreamBody(_) => {
                    tracing::error!(request_id = %request_id, path = %path, error = %err, "Upstream error");
                }
                _ => {
                    tracing::info!(request_id = %request_id, path = %path, error = %err, "Request rejected");
                }
            }
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarder() -> Forwarder {
        let upstream = UpstreamConfig {
            base_url: "http://grader:8080/".into(),
            ..UpstreamConfig::default()
        };
        Forwarder::new(&upstream, &LimitsConfig::default())
    }

    #[test]
    fn rewrites_path_and_query() {
        let f = forwarder();
        let uri: Uri = "/api/backend/submissions/42/stream?since=3".parse().unwrap();
        assert_eq!(
            f.target_uri(&uri).unwrap().to_string(),
            "http://grader:8080/api/submissions/42/stream?since=3"
        );
    }

    #[test]
    fn keeps_percent_encoding() {
        let f = forwarder();
        let uri: Uri = "/api/backend/challenges/a%2Fb".parse().unwrap();
        assert_eq!(
            f.target_uri(&uri).unwrap().to_string(),
            "http://grader:8080/api/challenges/a%2Fb"
        );
    }

    #[test]
    fn rejects_paths_outside_prefix() {
        let f = forwarder();
        let uri: Uri = "/api/backendx/users".parse().unwrap();
        assert!(matches!(f.target_uri(&uri), Err(ProxyError::NoRoute(_))));
    }

    #[test]
    fn forwards_only_allowlisted_headers() {
        let f = forwarder();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("JSESSIONID=abc"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=xyz"),
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        let post = f.forward_headers(&Method::POST, &headers);
        assert_eq!(post.len(), 2);
        assert_eq!(post[header::COOKIE], "JSESSIONID=abc");
        assert_eq!(post[header::CONTENT_TYPE], "multipart/form-data; boundary=xyz");

        let get = f.forward_headers(&Method::GET, &headers);
        assert_eq!(get.len(), 1);
        assert!(get.get(header::CONTENT_TYPE).is_none());
    }
}

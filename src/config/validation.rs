//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream address is a usable plain-HTTP base
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url '{0}' is not a valid URL")]
    UpstreamUrl(String),

    #[error("upstream.base_url scheme '{0}' is unsupported, only http is")]
    UpstreamScheme(String),

    #[error("upstream.route_prefix '{0}' must start with '/' and not end with '/'")]
    RoutePrefix(String),

    #[error("upstream.forward_headers entry '{0}' is not a valid header name")]
    HeaderName(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("grading.api_base '{0}' is not a valid URL")]
    ApiBase(String),

    #[error("grading.reconnect.base_delay_ms exceeds max_delay_ms")]
    BackoffRange,
}

/// Check a parsed configuration for semantic problems.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::UpstreamScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone())),
    }

    let prefix = &config.upstream.route_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::RoutePrefix(prefix.clone()));
    }

    for name in &config.upstream.forward_headers {
        if axum::http::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.limits.max_request_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_request_body_bytes"));
    }
    if config.limits.max_buffered_response_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_buffered_response_bytes"));
    }
    if config.grading.poll_interval_ms == 0 {
        errors.push(ValidationError::Zero("grading.poll_interval_ms"));
    }
    if Url::parse(&config.grading.api_base).is_err() {
        errors.push(ValidationError::ApiBase(config.grading.api_base.clone()));
    }
    if config.grading.reconnect.base_delay_ms > config.grading.reconnect.max_delay_ms {
        errors.push(ValidationError::BackoffRange);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

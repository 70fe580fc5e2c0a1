//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay
//! and for the grading consumer. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the grading relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream grading service and forwarding policy.
    pub upstream: UpstreamConfig,

    /// Body size ceilings.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Grading consumer settings (stream, polling, scroll).
    pub grading: GradingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Where requests are forwarded and which request headers survive the hop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base address of the grading backend (e.g., "http://localhost:8080").
    pub base_url: String,

    /// Path prefix the relay answers on. Everything after it is forwarded
    /// to `{base_url}/api/`.
    pub route_prefix: String,

    /// Request headers copied to the upstream call, lowercase.
    /// `content-type` is only copied for methods that carry a body.
    pub forward_headers: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            route_prefix: "/api/backend".to_string(),
            forward_headers: vec!["cookie".to_string(), "content-type".to_string()],
        }
    }
}

/// Body size ceilings in bytes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest request body read before forwarding (solution uploads).
    pub max_request_body_bytes: usize,

    /// Largest upstream body buffered for non-streaming responses.
    pub max_buffered_response_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 10 * 1024 * 1024,
            max_buffered_response_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed until upstream response headers arrive, in seconds.
    /// Streamed bodies are not bounded by it.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for terminals, json for log shippers.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Grading consumer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GradingConfig {
    /// API base the consumer talks to, usually the relay prefix.
    pub api_base: String,

    /// Interval between polls in fallback mode, in milliseconds.
    pub poll_interval_ms: u64,

    /// Distance from the bottom (px) within which the view keeps following.
    pub scroll_threshold_px: u32,

    /// Stream reconnection policy.
    pub reconnect: ReconnectConfig,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api/backend".to_string(),
            poll_interval_ms: 2000,
            scroll_threshold_px: 40,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnection backoff for the event stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Give up after this many consecutive failed attempts. Unbounded if unset.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

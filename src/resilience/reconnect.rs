//! Reconnection strategies for the grading event stream.
//!
//! Different hosts give different guarantees about automatic stream
//! reconnection, so the consumer owns the decision through a
//! [`ReconnectPolicy`].

use std::fmt::Debug;
use std::time::Duration;

use crate::config::ReconnectConfig;
use crate::resilience::backoff::calculate_backoff;

/// Decides whether a dropped stream is reopened, and after how long.
pub trait ReconnectPolicy: Send + Sync + Debug {
    /// `attempt` counts consecutive failures, starting at 1. `server_hint`
    /// is the last `retry` value the server sent, if any. `None` means give up.
    fn next_delay(&self, attempt: u32, server_hint: Option<Duration>) -> Option<Duration>;
}

/// Exponential backoff with jitter and an optional attempt ceiling.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32, server_hint: Option<Duration>) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }
        match server_hint {
            Some(hint) => Some(hint.min(self.max)),
            None => Some(calculate_backoff(attempt, self.base, self.max)),
        }
    }
}

/// Constant delay, the way browsers reopen an event source.
#[derive(Debug, Clone)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(Duration::from_secs(3))
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32, server_hint: Option<Duration>) -> Option<Duration> {
        Some(server_hint.unwrap_or(self.0))
    }
}

/// Never reconnect; the first drop ends the observation.
#[derive(Debug, Clone, Default)]
pub struct NoReconnect;

impl ReconnectPolicy for NoReconnect {
    fn next_delay(&self, _attempt: u32, _server_hint: Option<Duration>) -> Option<Duration> {
        None
    }
}

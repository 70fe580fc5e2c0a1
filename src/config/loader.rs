//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `upstream.base_url`, resolved at process start.
pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
/// Overrides `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "RELAY_BIND_ADDRESS";
/// Overrides `grading.api_base`.
pub const ENV_API_BASE: &str = "GRADING_API_BASE";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, ignoring the
/// environment.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    resolve_with(Some(path), |_| None)
}

/// Resolve the effective configuration: optional file, then environment
/// overrides, then validation.
pub fn resolve_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    resolve_with(path, |key| std::env::var(key).ok())
}

/// [`resolve_config`] with an explicit variable lookup.
pub fn resolve_with<F>(path: Option<&Path>, lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: RelayConfig = match path {
        Some(path) => toml::from_str(&fs::read_to_string(path)?)?,
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
        tracing::debug!(base_url = %url, "Upstream overridden from environment");
        config.upstream.base_url = url;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS).filter(|v| !v.is_empty()) {
        config.listener.bind_address = addr;
    }
    if let Some(base) = lookup(ENV_API_BASE).filter(|v| !v.is_empty()) {
        config.grading.api_base = base;
    }
}

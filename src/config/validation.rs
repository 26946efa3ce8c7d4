//! Configuration validation utilities.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a duration string using humantime (`15s`, `1m30s`, `500ms`).
///
/// Also used as the clap value parser for `--interval`.
///
/// # Examples
///
/// ```
/// use webprobe::config::parse_duration;
///
/// assert_eq!(parse_duration("15s").unwrap().as_secs(), 15);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}`; unset variables without a
/// default expand to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

/// Check that `namespace` can prefix a Prometheus metric name.
pub fn validate_metric_namespace(namespace: &str) -> Result<(), ConfigError> {
    static NAMESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = NAMESPACE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_:][A-Za-z0-9_:]*$").expect("failed to compile namespace regex")
    });

    if regex.is_match(namespace) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "invalid metrics namespace: '{}'",
            namespace
        )))
    }
}

//! Probe target parsing and canonicalization.
//!
//! A configured target can be a full URL (`http://example.test/health`) or a
//! bare hostname (`example.test`). Both forms resolve to the same label so
//! that metrics and stored documents agree on the identifier.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Scheme used when the configured target has none.
const DEFAULT_SCHEME: &str = "http";

/// Errors raised while parsing a target string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Target string was empty or whitespace.
    #[error("target is empty")]
    Empty,

    /// Target could not be parsed as a URL.
    #[error("invalid target '{target}': {reason}")]
    Invalid { target: String, reason: String },

    /// URL parsed but has no host component.
    #[error("target '{0}' has no host")]
    MissingHost(String),

    /// Only HTTP and HTTPS are probed.
    #[error("target '{target}' uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { target: String, scheme: String },
}

/// A probe destination.
///
/// Immutable once built. `label()` is the bare host and is used for every
/// metric label and stored `target` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    url: Url,
    host: String,
}

impl Target {
    /// Parse a configured target string.
    ///
    /// # Errors
    /// Returns [`TargetError`] if the string is empty, has no host, or uses a
    /// scheme other than `http`/`https`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TargetError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{DEFAULT_SCHEME}://{trimmed}")
        };

        let url = Url::parse(&candidate).map_err(|e| TargetError::Invalid {
            target: raw.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TargetError::UnsupportedScheme {
                target: raw.clone(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.trim_start_matches('[').trim_end_matches(']'),
            _ => return Err(TargetError::MissingHost(raw.clone())),
        }
        .to_string();

        Ok(Self { raw, url, host })
    }

    /// The string as configured.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Bare hostname for ICMP probing (no scheme, port, or path).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Full URL for HTTP probing.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Canonical identifier used for metric labels and storage.
    pub fn label(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

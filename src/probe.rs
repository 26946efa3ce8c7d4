//! Probe Layer
//!
//! Single-shot measurements against one [`Target`]. Probes never fail from
//! the caller's point of view: every error is folded into a sentinel value
//! (`NaN`, `100.0`, `0`, `408`) at the probe boundary.
//!
//! - [`PingProbe`] / [`SystemPing`]: ICMP echo via the OS `ping` utility
//! - [`HttpProbe`] / [`ReqwestProbe`]: timed HTTP GET
//! - [`Target`]: parsed probe destination

pub mod http;
pub mod ping;
mod target;

use std::time::Duration;

use thiserror::Error;

pub use http::{HttpProbe, HttpResult, ReqwestProbe};
pub use ping::{PingConfig, PingPlatform, PingProbe, PingResult, SystemPing, parse_ping_output};
pub use target::{Target, TargetError};

/// Errors raised inside a probe before they are mapped to sentinels.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Failed to spawn or wait on the probe process.
    #[error("process error: {0}")]
    Process(#[from] std::io::Error),

    /// Probe process exited unsuccessfully.
    #[error("exited with {status}: {detail}")]
    ExitStatus { status: String, detail: String },

    /// Timeout elapsed.
    #[error("timeout elapsed after {0:?}")]
    Timeout(Duration),

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Serde helpers that encode a non-finite `f64` as `null` and read `null`
/// back as `NaN`.
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

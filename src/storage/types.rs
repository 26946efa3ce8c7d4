//! Core data types for the storage layer.
//!
//! - [`Observation`]: one target's ping and HTTP results for one round

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::{HttpResult, PingResult, Target};

/// A single observation, stored as one document.
///
/// Created once per target per round and handed to the metrics and
/// persistence sinks; not retained afterwards.
///
/// # Example
///
/// ```
/// use webprobe::{HttpResult, Observation, PingResult, Target};
/// use chrono::Utc;
///
/// let target = Target::parse("http://example.test").unwrap();
/// let obs = Observation::new(
///     Utc::now(),
///     &target,
///     PingResult::new(12.3, 0.0),
///     HttpResult::new(45.0, 200),
/// );
/// assert_eq!(obs.target, "example.test");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// When the round reached this target (UTC, RFC 3339 in documents).
    pub timestamp: DateTime<Utc>,
    /// Canonical target label (bare host).
    pub target: String,
    /// URL that was requested by the HTTP probe.
    pub url: String,
    /// ICMP results.
    pub ping: PingResult,
    /// HTTP results.
    pub http: HttpResult,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, target: &Target, ping: PingResult, http: HttpResult) -> Self {
        Self {
            timestamp,
            target: target.label().to_string(),
            url: target.url().to_string(),
            ping,
            http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(ping: PingResult, http: HttpResult) -> Observation {
        let target = Target::parse("http://example.test").unwrap();
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Observation::new(ts, &target, ping, http)
    }

    #[test]
    fn test_document_shape() {
        let obs = sample(PingResult::new(12.3, 0.0), HttpResult::new(45.0, 200));
        let doc = serde_json::to_value(&obs).unwrap();
        assert_eq!(
            doc,
            json!({
                "timestamp": "2024-05-01T12:00:00Z",
                "target": "example.test",
                "url": "http://example.test/",
                "ping": { "rtt_ms": 12.3, "packet_loss_percent": 0.0 },
                "http": { "response_time_ms": 45.0, "status_code": 200 }
            })
        );
    }

    #[test]
    fn test_nan_is_stored_as_null_and_restored() {
        let obs = sample(PingResult::failed(), HttpResult::unmeasurable());
        let doc = serde_json::to_value(&obs).unwrap();
        assert_eq!(doc["ping"]["rtt_ms"], serde_json::Value::Null);
        assert_eq!(doc["ping"]["packet_loss_percent"], json!(100.0));
        assert_eq!(doc["http"]["response_time_ms"], serde_json::Value::Null);
        assert_eq!(doc["http"]["status_code"], json!(0));

        let back: Observation = serde_json::from_value(doc).unwrap();
        assert!(back.ping.is_failure());
        assert!(back.http.response_time_ms.is_nan());
        assert_eq!(back.timestamp, obs.timestamp);
    }
}

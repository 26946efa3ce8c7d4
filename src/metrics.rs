//! Metrics Layer
//!
//! Last-value snapshot of every probe, exposed in the Prometheus text format.
//! The registry is owned by [`ProbeMetrics`] and passed around explicitly;
//! nothing is registered in the process-global default registry.
//!
//! | Instrument                 | Kind    | Labels                  |
//! |----------------------------|---------|-------------------------|
//! | `ping_latency_ms`          | gauge   | `target`                |
//! | `ping_packet_loss_percent` | gauge   | `target`                |
//! | `http_response_time_ms`    | gauge   | `target`                |
//! | `http_status_code`         | gauge   | `target`                |
//! | `http_requests_total`      | counter | `target`, `status_code` |

use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::storage::Observation;

/// Label carrying the canonical target identifier.
pub const TARGET_LABEL: &str = "target";

/// Label carrying the HTTP status code on the request counter.
pub const STATUS_CODE_LABEL: &str = "status_code";

/// Receives one observation per target per round.
pub trait MetricsSink: Send + Sync + 'static {
    /// Fold an observation into the current snapshot.
    fn record(&self, observation: &Observation);
}

/// Prometheus-backed [`MetricsSink`].
///
/// Gauges and counters use the atomic `set`/`inc` primitives, so a
/// concurrent scrape never observes a partially written value.
#[derive(Clone)]
pub struct ProbeMetrics {
    registry: Registry,
    ping_latency_ms: GaugeVec,
    ping_packet_loss_percent: GaugeVec,
    http_response_time_ms: GaugeVec,
    http_status_code: GaugeVec,
    http_requests_total: IntCounterVec,
}

impl std::fmt::Debug for ProbeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeMetrics").finish_non_exhaustive()
    }
}

impl ProbeMetrics {
    /// Create the instruments and register them in a fresh registry.
    ///
    /// `namespace` prefixes every metric name (`web` → `web_ping_latency_ms`).
    ///
    /// # Errors
    /// Returns a `prometheus::Error` if a name is invalid.
    pub fn new(namespace: Option<&str>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let opts = |name: &str, help: &str| {
            let opts = Opts::new(name, help);
            match namespace {
                Some(ns) => opts.namespace(ns),
                None => opts,
            }
        };

        let ping_latency_ms = GaugeVec::new(
            opts("ping_latency_ms", "Average ICMP round-trip time in milliseconds"),
            &[TARGET_LABEL],
        )?;
        let ping_packet_loss_percent = GaugeVec::new(
            opts("ping_packet_loss_percent", "ICMP packet loss percentage"),
            &[TARGET_LABEL],
        )?;
        let http_response_time_ms = GaugeVec::new(
            opts("http_response_time_ms", "HTTP GET response time in milliseconds"),
            &[TARGET_LABEL],
        )?;
        let http_status_code = GaugeVec::new(
            opts(
                "http_status_code",
                "Last HTTP status code (0 = connection failure, 408 = timeout)",
            ),
            &[TARGET_LABEL],
        )?;
        let http_requests_total = IntCounterVec::new(
            opts("http_requests_total", "HTTP probes performed, by status code"),
            &[TARGET_LABEL, STATUS_CODE_LABEL],
        )?;

        registry.register(Box::new(ping_latency_ms.clone()))?;
        registry.register(Box::new(ping_packet_loss_percent.clone()))?;
        registry.register(Box::new(http_response_time_ms.clone()))?;
        registry.register(Box::new(http_status_code.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry,
            ping_latency_ms,
            ping_packet_loss_percent,
            http_response_time_ms,
            http_status_code,
            http_requests_total,
        })
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    /// Returns a `prometheus::Error` if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Set a gauge unless the value is not a number.
fn set_finite(gauge: &GaugeVec, target: &str, value: f64) {
    if value.is_nan() {
        return;
    }
    gauge.with_label_values(&[target]).set(value);
}

impl MetricsSink for ProbeMetrics {
    fn record(&self, observation: &Observation) {
        let target = observation.target.as_str();
        let status = observation.http.status_code;

        set_finite(&self.ping_latency_ms, target, observation.ping.rtt_ms);
        set_finite(
            &self.ping_packet_loss_percent,
            target,
            observation.ping.packet_loss_percent,
        );
        set_finite(
            &self.http_response_time_ms,
            target,
            observation.http.response_time_ms,
        );

        self.http_status_code
            .with_label_values(&[target])
            .set(f64::from(status));
        let status_label = status.to_string();
        self.http_requests_total
            .with_label_values(&[target, status_label.as_str()])
            .inc();
    }
}

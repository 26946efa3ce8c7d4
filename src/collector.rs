//! Collector Layer
//!
//! One measurement round: every configured target is pinged, then requested
//! over HTTP, and the resulting [`Observation`] is handed to the metrics and
//! persistence sinks. Targets are visited strictly in order, one at a time.
//!
//! # Error Handling Philosophy
//!
//! Probe failures are valid observations. They arrive here already encoded
//! as sentinel values and are recorded like any other result; a round never
//! stops early and always yields exactly one observation per target.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webprobe::{
//!     Collector, PersistenceConfig, PersistenceSink, PingConfig, ProbeMetrics, ReqwestProbe,
//!     SystemPing, Target,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let collector = Collector::new(
//!     Arc::new(SystemPing::new(PingConfig::default())),
//!     Arc::new(ReqwestProbe::new(std::time::Duration::from_secs(5))?),
//!     Arc::new(ProbeMetrics::new(None)?),
//!     Arc::new(PersistenceSink::new(PersistenceConfig::new("sqlite::memory:"))),
//! );
//! let report = collector.run_round(&[Target::parse("example.test")?]).await;
//! assert_eq!(report.observations, 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::metrics::MetricsSink;
use crate::probe::{HttpProbe, PingProbe, Target};
use crate::storage::{Observation, RecordSink};

/// Summary of one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Targets configured for the round.
    pub targets: usize,
    /// Observations produced (always equal to `targets`).
    pub observations: usize,
    /// Wall-clock time of the round.
    pub duration: Duration,
}

/// Runs measurement rounds against a fixed set of sinks.
pub struct Collector {
    ping: Arc<dyn PingProbe>,
    http: Arc<dyn HttpProbe>,
    metrics: Arc<dyn MetricsSink>,
    sink: Arc<dyn RecordSink>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").finish_non_exhaustive()
    }
}

impl Collector {
    pub fn new(
        ping: Arc<dyn PingProbe>,
        http: Arc<dyn HttpProbe>,
        metrics: Arc<dyn MetricsSink>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            ping,
            http,
            metrics,
            sink,
        }
    }

    /// Probe every target once, in order.
    pub async fn run_round(&self, targets: &[Target]) -> RoundReport {
        let start = Instant::now();
        let mut observations = 0;

        for target in targets {
            let observation = self.observe(target).await;
            self.metrics.record(&observation);
            self.sink.write(&observation).await;
            observations += 1;
        }

        RoundReport {
            targets: targets.len(),
            observations,
            duration: start.elapsed(),
        }
    }

    async fn observe(&self, target: &Target) -> Observation {
        tracing::info!(endpoint = %target.label(), raw = %target.raw(), "Collecting metrics");
        let timestamp = Utc::now();

        let ping = self.ping.probe(target).await;
        tracing::info!(
            endpoint = %target.label(),
            rtt_ms = ping.rtt_ms,
            packet_loss_percent = ping.packet_loss_percent,
            "Ping result"
        );

        let http = self.http.probe(target).await;
        tracing::info!(
            endpoint = %target.label(),
            response_time_ms = http.response_time_ms,
            status_code = http.status_code,
            "HTTP result"
        );

        Observation::new(timestamp, target, ping, http)
    }
}

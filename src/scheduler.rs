//! Round scheduling.
//!
//! Runs collector rounds back to back with a fixed sleep between them. The
//! interval is measured from the end of one round to the start of the next,
//! so rounds never overlap and slow targets stretch the cadence.
//!
//! Shutdown is observed before each round and during the sleep. A round that
//! has already started is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use crate::collector::Collector;
use crate::probe::Target;
use crate::shutdown::Shutdown;

/// Default pause between rounds (15 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Drives [`Collector`] rounds until shutdown.
#[derive(Debug)]
pub struct Scheduler {
    collector: Arc<Collector>,
    targets: Vec<Target>,
    interval: Duration,
    shutdown: Shutdown,
}

impl Scheduler {
    pub fn new(
        collector: Arc<Collector>,
        targets: Vec<Target>,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            collector,
            targets,
            interval,
            shutdown,
        }
    }

    /// Run until shutdown is requested. Returns the number of completed rounds.
    pub async fn run(mut self) -> u64 {
        tracing::info!(
            targets = self.targets.len(),
            interval_secs = self.interval.as_secs_f64(),
            "Scheduler started"
        );

        let mut rounds = 0u64;
        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let report = self.collector.run_round(&self.targets).await;
            rounds += 1;
            tracing::debug!(
                round = rounds,
                observations = report.observations,
                duration_ms = report.duration.as_millis(),
                "Round completed"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.triggered() => break,
            }
        }

        tracing::info!(rounds, "Scheduler stopped");
        rounds
    }
}

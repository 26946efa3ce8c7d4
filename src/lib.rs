//! webprobe - Periodic Network Health Prober
//!
//! Pings and requests a fixed list of targets on a fixed cadence, exposes the
//! latest result of every probe as Prometheus metrics, and appends each
//! observation to a document store when one is reachable. It can be used as
//! a library, or run as a standalone binary with the `webprobe` executable.
//!
//! # Architecture
//!
//! - **Probes**: OS `ping` and timed HTTP GET, failures folded into sentinels
//! - **Metrics**: private Prometheus registry served on `/metrics`
//! - **Storage**: SQLite document collection behind a best-effort writer
//! - **Collector / Scheduler**: sequential rounds with a fixed sleep between
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webprobe::{
//!     Collector, PersistenceConfig, PersistenceSink, PingConfig, ProbeMetrics, ReqwestProbe,
//!     Scheduler, SystemPing, Target, shutdown,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (trigger, shutdown) = shutdown::channel();
//!     let persistence = Arc::new(PersistenceSink::new(PersistenceConfig::new(
//!         "sqlite:webprobe.db?mode=rwc",
//!     )));
//!     persistence.connect(shutdown.clone()).await;
//!
//!     let collector = Arc::new(Collector::new(
//!         Arc::new(SystemPing::new(PingConfig::default())),
//!         Arc::new(ReqwestProbe::new(std::time::Duration::from_secs(5))?),
//!         Arc::new(ProbeMetrics::new(None)?),
//!         persistence,
//!     ));
//!
//!     tokio::spawn(async move {
//!         shutdown::wait_for_signal().await;
//!         trigger.trigger();
//!     });
//!
//!     let targets = vec![Target::parse("example.com")?];
//!     Scheduler::new(collector, targets, webprobe::DEFAULT_INTERVAL, shutdown)
//!         .run()
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod scheduler;
pub mod server;
pub mod shutdown;
pub mod storage;

pub use collector::{Collector, RoundReport};
pub use metrics::{MetricsSink, ProbeMetrics};
pub use probe::{
    HttpProbe, HttpResult, PingConfig, PingProbe, PingResult, ReqwestProbe, SystemPing, Target,
    TargetError,
};
pub use scheduler::{DEFAULT_INTERVAL, Scheduler};
pub use storage::{
    DocumentStore, Observation, PersistenceConfig, PersistenceSink, PersistenceState, RecordSink,
    StorageError,
};

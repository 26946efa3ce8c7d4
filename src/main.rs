//! webprobe Binary Entry Point
//!
//! Runs the prober, the metrics exporter and the persistence writer until
//! SIGINT/SIGTERM. Core functionality is provided by the `webprobe` library.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webprobe::{
    Collector, PersistenceSink, ProbeMetrics, ReqwestProbe, Scheduler, SystemPing,
    config::{AppConfig, parse_duration},
    server::{AppState, create_router},
    shutdown,
};

/// webprobe - Periodic Network Health Prober
#[derive(Parser, Debug)]
#[command(name = "webprobe", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "WEBPROBE_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "WEBPROBE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "WEBPROBE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(long, env = "WEBPROBE_DB_URL")]
    db_url: Option<String>,

    /// Pause between rounds, e.g. `15s` (overrides config file)
    #[arg(long, env = "WEBPROBE_INTERVAL", value_parser = parse_duration)]
    interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webprobe=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("webprobe - Periodic Network Health Prober");

    let cli = Cli::parse();

    let (mut config, from_file) = AppConfig::load_or_default(&cli.config)?;
    if from_file {
        tracing::info!("Loaded configuration from: {}", cli.config);
    } else {
        tracing::warn!("Config file {} not found, using defaults", cli.config);
    }

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(url) = cli.db_url {
        config.database.url = url;
    }
    if let Some(interval) = cli.interval {
        config.probe.interval = interval;
    }
    config.validate()?;

    tracing::info!(
        targets = config.targets.len(),
        interval_secs = config.probe.interval.as_secs_f64(),
        collection = %config.database.collection,
        "Configuration ready"
    );

    let metrics = Arc::new(ProbeMetrics::new(config.metrics.namespace.as_deref())?);
    let persistence = Arc::new(PersistenceSink::new(config.to_persistence_config()));

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        trigger.trigger();
    });

    // Exporter
    let app = create_router(AppState {
        metrics: metrics.clone(),
        persistence: persistence.clone(),
    });
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on: http://{}/metrics", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let mut server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.triggered().await })
            .await
    });

    // Persistence connects before the first round; failure leaves it disabled.
    let state = persistence.connect(shutdown.clone()).await;
    tracing::info!(state = %state, "Persistence initialized");

    let collector = Arc::new(Collector::new(
        Arc::new(SystemPing::new(config.ping_config())),
        Arc::new(ReqwestProbe::new(config.probe.http_timeout)?),
        metrics,
        persistence.clone(),
    ));

    let rounds = Scheduler::new(collector, config.targets, config.probe.interval, shutdown)
        .run()
        .await;

    tracing::info!(rounds, "Shutting down metrics server...");
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Metrics server failed: {}", e),
        Err(e) => tracing::error!("Metrics server task failed: {}", e),
    }

    tracing::info!("Shutting down storage...");
    persistence.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

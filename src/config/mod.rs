//! Configuration module for webprobe.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Exporter server settings (port, bind address)
//! - Document store settings (URL, collection, retry policy)
//! - Probe cadence and timeouts
//! - The ordered target list

mod app;
mod validation;

pub use app::{
    AppConfig, DatabaseConfig, MetricsConfig, ProbeConfig, ServerConfig, DEFAULT_DATABASE_URL,
    DEFAULT_PORT, DEFAULT_TARGETS,
};
pub use validation::{ConfigError, expand_env_vars, parse_duration, validate_metric_namespace};

//! Application configuration structures.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::probe::{PingConfig, Target};
use crate::probe::http::DEFAULT_HTTP_TIMEOUT;
use crate::probe::ping::{DEFAULT_PING_COUNT, DEFAULT_PING_TIMEOUT};
use crate::scheduler::DEFAULT_INTERVAL;
use crate::storage::db::validate_collection_name;
use crate::storage::{
    DEFAULT_COLLECTION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
    PersistenceConfig,
};

use super::validation::{ConfigError, expand_env_vars, validate_metric_namespace};

// =============================================================================
// Constants
// =============================================================================

/// Default exporter port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:webprobe.db?mode=rwc";

/// Targets probed when no configuration file is present.
pub const DEFAULT_TARGETS: &[&str] = &["http://google.com", "youtube.com", "http://rnp.br"];

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_targets() -> Vec<Target> {
    DEFAULT_TARGETS
        .iter()
        .filter_map(|raw| Target::parse(*raw).ok())
        .collect()
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Exporter server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL. `${VAR}` and `${VAR:-default}` are expanded at connect time.
    pub url: String,

    /// Collection (table) receiving observations.
    pub collection: String,

    /// Connection attempts before persistence is disabled (default: 5).
    pub max_retries: u32,

    /// Fixed delay between attempts (default: 5s).
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Bound on a single attempt (default: 5s).
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            collection: default_collection(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// =============================================================================
// Probe Configuration
// =============================================================================

/// Round cadence and per-probe limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Pause between rounds (default: 15s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Echo requests per ping (default: 4).
    pub ping_count: u32,

    /// Bound on one ping invocation (default: 10s).
    #[serde(with = "humantime_serde")]
    pub ping_timeout: Duration,

    /// Bound on one HTTP request (default: 5s).
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Ping executable, when not `ping` from `PATH`.
    pub ping_program: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            ping_count: DEFAULT_PING_COUNT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            ping_program: None,
        }
    }
}

/// Exporter naming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Optional prefix for every metric name.
    pub namespace: Option<String>,
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Exporter server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Metric naming.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Ordered list of targets probed each round.
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            probe: ProbeConfig::default(),
            metrics: MetricsConfig::default(),
            targets: default_targets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    ///
    /// Returns the configuration and whether it came from the file.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<(Self, bool), ConfigError> {
        if path.as_ref().exists() {
            Ok((Self::load(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database url cannot be empty".to_string(),
            ));
        }

        validate_collection_name(&self.database.collection).map_err(|e| {
            ConfigError::ValidationError(format!("database collection: {}", e))
        })?;

        if self.probe.ping_count == 0 {
            return Err(ConfigError::ValidationError(
                "probe ping_count must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("interval", self.probe.interval),
            ("ping_timeout", self.probe.ping_timeout),
            ("http_timeout", self.probe.http_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "probe {} must be non-zero",
                    name
                )));
            }
        }

        if let Some(ns) = &self.metrics.namespace {
            validate_metric_namespace(ns)?;
        }

        if self.targets.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one target is required".to_string(),
            ));
        }

        // Targets sharing a label would share metric series.
        let mut seen_labels = HashSet::new();
        for target in &self.targets {
            if !seen_labels.insert(target.label()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate target '{}' (label '{}')",
                    target.raw(),
                    target.label()
                )));
            }
        }

        Ok(())
    }

    /// Socket address of the exporter.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the bind address is not an IP.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.server.bind.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Persistence settings with environment variables expanded in the URL.
    pub fn to_persistence_config(&self) -> PersistenceConfig {
        PersistenceConfig::new(expand_env_vars(&self.database.url))
            .with_collection(&self.database.collection)
            .with_max_retries(self.database.max_retries)
            .with_retry_delay(self.database.retry_delay)
            .with_connect_timeout(self.database.connect_timeout)
    }

    /// Settings for the system ping probe.
    pub fn ping_config(&self) -> PingConfig {
        let config = PingConfig::default()
            .with_count(self.probe.ping_count)
            .with_timeout(self.probe.ping_timeout);

        match &self.probe.ping_program {
            Some(program) => config.with_program(program),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.collection, "monitor_results");
        assert_eq!(config.database.max_retries, 5);
        assert_eq!(config.database.retry_delay, Duration::from_secs(5));
        assert_eq!(config.probe.interval, Duration::from_secs(15));
        assert_eq!(config.probe.ping_count, 4);
        assert_eq!(config.probe.http_timeout, Duration::from_secs(5));

        let labels: Vec<_> = config.targets.iter().map(|t| t.label()).collect();
        assert_eq!(labels, vec!["google.com", "youtube.com", "rnp.br"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
server:
  bind: 127.0.0.1
  port: 9100
database:
  url: "sqlite::memory:"
  collection: probes
  max_retries: 2
  retry_delay: 500ms
probe:
  interval: 30s
  ping_count: 2
  ping_timeout: 3s
  http_timeout: 2s
metrics:
  namespace: net
targets:
  - https://example.com/health
  - example.org
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:9100");
        assert_eq!(config.database.retry_delay, Duration::from_millis(500));
        assert_eq!(config.database.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.probe.interval, Duration::from_secs(30));
        assert_eq!(config.metrics.namespace.as_deref(), Some("net"));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].url(), "https://example.com/health");
        assert_eq!(config.targets[1].label(), "example.org");

        let persistence = config.to_persistence_config();
        assert_eq!(persistence.collection, "probes");
        assert_eq!(persistence.max_retries, 2);

        let ping = config.ping_config();
        assert_eq!(ping.count, 2);
        assert_eq!(ping.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("targets: [a.test]").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.probe.interval, DEFAULT_INTERVAL);
        assert_eq!(config.targets.len(), 1);
    }

    #[test]
    fn test_invalid_target_is_parse_error() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("targets: [\"ftp://x.test\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.bind = "not-an-ip".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid server bind address"));

        let mut config = AppConfig::default();
        config.targets.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.probe.ping_count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.probe.http_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.collection = "drop table".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.metrics.namespace = Some("bad-ns".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_labels() {
        let yaml = r#"targets: ["http://x.test:8080/", "http://x.test:9090/"]"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate target"));
        assert!(err.contains("x.test"));

        // Scheme and bare forms of the same host also collide.
        let yaml = r#"targets: [example.test, "https://example.test/health"]"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig = serde_yaml::from_str("targets: [a.test, b.test]").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_section_without_url_uses_defaults() {
        let yaml = "database:\n  collection: probes\n  retry_delay: 1s\ntargets: [a.test]\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.collection, "probes");
        assert_eq!(config.database.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.database.retry_delay, Duration::from_secs(1));
        assert_eq!(config.database.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let (config, from_file) = AppConfig::load_or_default(&missing).unwrap();
        assert!(!from_file);
        assert_eq!(config.targets.len(), 3);

        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "server:\n  port: 9000\ntargets: [one.test, two.test]").unwrap();

        let (config, from_file) = AppConfig::load_or_default(&path).unwrap();
        assert!(from_file);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.targets.len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "targets: []\n").unwrap();

        let result = AppConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}

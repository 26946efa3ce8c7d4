//! ICMP ping probe.
//!
//! Shells out to the operating system's `ping` utility and extracts the
//! average round-trip time and packet loss from its summary lines. Output
//! parsing is a pure function so it can be checked against captured samples
//! from each platform.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;

use super::{ProbeError, Target, nan_as_null};

/// Default number of echo requests per probe.
pub const DEFAULT_PING_COUNT: u32 = 4;

/// Default bound on one `ping` invocation (10 seconds).
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Packet loss reported when the probe could not run at all.
pub const FAILURE_PACKET_LOSS: f64 = 100.0;

const DEFAULT_PROGRAM: &str = "ping";

/// RTT markers on POSIX systems (`rtt min/avg/max/mdev`, `round-trip min/avg/max/stddev`).
const UNIX_RTT_MARKER: &str = "min/avg/max";
const UNIX_LOSS_MARKER: &str = "packet loss";

/// RTT markers on Windows (English and Portuguese locales). `ping.exe` writes
/// in the OEM code page, so a non-ASCII `é` decodes to U+FFFD.
const WINDOWS_RTT_MARKERS: &[&str] = &["Average =", "Média =", "Media =", "M\u{FFFD}dia ="];
const WINDOWS_LOSS_MARKERS: &[&str] = &["Lost =", "Perdidos ="];

/// Outcome of one ping probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PingResult {
    /// Average round-trip time in milliseconds (`NaN` if unmeasurable).
    #[serde(with = "nan_as_null")]
    pub rtt_ms: f64,
    /// Packet loss percentage, 0-100 (`100.0` on total failure).
    #[serde(with = "nan_as_null")]
    pub packet_loss_percent: f64,
}

impl PingResult {
    pub fn new(rtt_ms: f64, packet_loss_percent: f64) -> Self {
        Self {
            rtt_ms,
            packet_loss_percent,
        }
    }

    /// Sentinel for a probe that could not run: `(NaN, 100.0)`.
    pub fn failed() -> Self {
        Self::new(f64::NAN, FAILURE_PACKET_LOSS)
    }

    /// Whether this is exactly the failure sentinel.
    pub fn is_failure(&self) -> bool {
        self.rtt_ms.is_nan() && self.packet_loss_percent == FAILURE_PACKET_LOSS
    }
}

/// Output dialect of the platform's ping utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPlatform {
    /// Linux, BSD, macOS, busybox.
    Unix,
    /// Windows `ping.exe`.
    Windows,
}

impl PingPlatform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Flag selecting the echo count.
    fn count_flag(self) -> &'static str {
        match self {
            Self::Unix => "-c",
            Self::Windows => "-n",
        }
    }
}

/// Parse the textual output of `ping`.
///
/// Each value falls back to `NaN` when its marker line is missing, so new or
/// localized output formats degrade to sentinels rather than errors. When a
/// marker appears more than once the last occurrence wins.
pub fn parse_ping_output(output: &str, platform: PingPlatform) -> PingResult {
    let (rtt, loss): (fn(&str) -> Option<f64>, fn(&str) -> Option<f64>) = match platform {
        PingPlatform::Unix => (unix_rtt, unix_loss),
        PingPlatform::Windows => (windows_rtt, windows_loss),
    };

    PingResult::new(
        output.lines().filter_map(rtt).last().unwrap_or(f64::NAN),
        output.lines().filter_map(loss).last().unwrap_or(f64::NAN),
    )
}

// rtt min/avg/max/mdev = 11.802/12.300/12.911/0.410 ms
fn unix_rtt(line: &str) -> Option<f64> {
    if !line.contains(UNIX_RTT_MARKER) {
        return None;
    }
    let (_, values) = line.split_once('=')?;
    values.trim().split('/').nth(1)?.trim().parse().ok()
}

// 4 packets transmitted, 3 received, +1 errors, 25% packet loss, time 3004ms
fn unix_loss(line: &str) -> Option<f64> {
    let segment = line.split(',').find(|s| s.contains(UNIX_LOSS_MARKER))?;
    segment.split('%').next()?.trim().parse().ok()
}

// Minimum = 9ms, Maximum = 12ms, Average = 10ms
fn windows_rtt(line: &str) -> Option<f64> {
    let rest = WINDOWS_RTT_MARKERS
        .iter()
        .find_map(|marker| line.split_once(marker).map(|(_, rest)| rest))?;
    rest.split("ms").next()?.trim().parse().ok()
}

// Packets: Sent = 4, Received = 4, Lost = 0 (0% loss),
fn windows_loss(line: &str) -> Option<f64> {
    let rest = WINDOWS_LOSS_MARKERS
        .iter()
        .find_map(|marker| line.split_once(marker).map(|(_, rest)| rest))?;
    let (_, inner) = rest.split_once('(')?;
    inner.split('%').next()?.trim().parse().ok()
}

/// Combine stdout and stderr into one lossily decoded string.
fn decode_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(stderr));
    text
}

/// Settings for [`SystemPing`].
#[derive(Debug, Clone)]
pub struct PingConfig {
    /// Executable to invoke (default: `ping` from `PATH`).
    pub program: String,
    /// Echo requests per probe.
    pub count: u32,
    /// Bound on the whole invocation.
    pub timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            count: DEFAULT_PING_COUNT,
            timeout: DEFAULT_PING_TIMEOUT,
        }
    }
}

impl PingConfig {
    /// Set the executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the echo count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Measures reachability of a target.
#[async_trait::async_trait]
pub trait PingProbe: Send + Sync + 'static {
    /// Probe the target once. Failures are returned as [`PingResult::failed`].
    async fn probe(&self, target: &Target) -> PingResult;
}

/// [`PingProbe`] backed by the OS `ping` utility.
#[derive(Debug, Clone)]
pub struct SystemPing {
    config: PingConfig,
    platform: PingPlatform,
}

impl SystemPing {
    pub fn new(config: PingConfig) -> Self {
        Self {
            config,
            platform: PingPlatform::current(),
        }
    }

    /// Override the output dialect.
    pub fn with_platform(mut self, platform: PingPlatform) -> Self {
        self.platform = platform;
        self
    }

    fn command(&self, host: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg(self.platform.count_flag())
            .arg(self.config.count.to_string())
            .arg(host);
        cmd
    }

    /// Run a prepared command under the configured timeout and parse its output.
    async fn execute(&self, mut cmd: Command) -> Result<PingResult, ProbeError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;
        let output = match timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(self.config.timeout)),
        };

        let text = decode_output(&output.stdout, &output.stderr);

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                status: output.status.to_string(),
                detail: text.trim().to_string(),
            });
        }

        Ok(parse_ping_output(&text, self.platform))
    }
}

#[async_trait::async_trait]
impl PingProbe for SystemPing {
    async fn probe(&self, target: &Target) -> PingResult {
        match self.execute(self.command(target.host())).await {
            Ok(result) => {
                tracing::debug!(
                    endpoint = %target.label(),
                    rtt_ms = result.rtt_ms,
                    packet_loss_percent = result.packet_loss_percent,
                    "Ping probe completed"
                );
                result
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %target.label(),
                    host = %target.host(),
                    error = %e,
                    "Ping probe failed"
                );
                PingResult::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OK: &str = "\
PING example.test (93.184.216.34) 56(84) bytes of data.
64 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=12.1 ms
64 bytes from 93.184.216.34: icmp_seq=2 ttl=56 time=12.9 ms

--- example.test ping statistics ---
4 packets transmitted, 4 received, 0% packet loss, time 3004ms
rtt min/avg/max/mdev = 11.802/12.300/12.911/0.410 ms
";

    const LINUX_ERRORS: &str = "\
--- 10.255.255.1 ping statistics ---
4 packets transmitted, 0 received, +4 errors, 100% packet loss, time 3050ms
";

    const MACOS_PARTIAL: &str = "\
--- example.test ping statistics ---
4 packets transmitted, 3 packets received, 25.0% packet loss
round-trip min/avg/max/stddev = 10.123/11.456/12.789/1.001 ms
";

    const WINDOWS_EN: &str = "\
Ping statistics for 8.8.8.8:
    Packets: Sent = 4, Received = 4, Lost = 0 (0% loss),
Approximate round trip times in milli-seconds:
    Minimum = 9ms, Maximum = 12ms, Average = 10ms
";

    const WINDOWS_PT: &str = "\
Estatísticas do Ping para 8.8.8.8:
    Pacotes: Enviados = 4, Recebidos = 3, Perdidos = 1 (25% de perda),
Aproximar um número redondo de vezes em milissegundos:
    Mínimo = 9ms, Máximo = 14ms, Média = 11ms
";

    #[test]
    fn test_parse_linux_output() {
        let result = parse_ping_output(LINUX_OK, PingPlatform::Unix);
        assert_eq!(result.rtt_ms, 12.3);
        assert_eq!(result.packet_loss_percent, 0.0);
    }

    #[test]
    fn test_parse_linux_output_with_errors() {
        let result = parse_ping_output(LINUX_ERRORS, PingPlatform::Unix);
        assert!(result.rtt_ms.is_nan());
        assert_eq!(result.packet_loss_percent, 100.0);
    }

    #[test]
    fn test_parse_macos_output() {
        let result = parse_ping_output(MACOS_PARTIAL, PingPlatform::Unix);
        assert_eq!(result.rtt_ms, 11.456);
        assert_eq!(result.packet_loss_percent, 25.0);
    }

    #[test]
    fn test_parse_windows_english() {
        let result = parse_ping_output(WINDOWS_EN, PingPlatform::Windows);
        assert_eq!(result.rtt_ms, 10.0);
        assert_eq!(result.packet_loss_percent, 0.0);
    }

    #[test]
    fn test_parse_windows_portuguese() {
        let result = parse_ping_output(WINDOWS_PT, PingPlatform::Windows);
        assert_eq!(result.rtt_ms, 11.0);
        assert_eq!(result.packet_loss_percent, 25.0);
    }

    #[test]
    fn test_parse_windows_portuguese_oem_codepage() {
        // CP850: 0x82 = é, 0xA1 = í, 0xA0 = á, 0xA3 = ú.
        let stdout: &[u8] = b"Estat\xa1sticas do Ping para 8.8.8.8:\r\n\
    Pacotes: Enviados = 4, Recebidos = 4, Perdidos = 0 (0% de perda),\r\n\
Aproximar um n\xa3mero redondo de vezes em milissegundos:\r\n\
    M\xa1nimo = 9ms, M\xa0ximo = 14ms, M\x82dia = 11ms\r\n";

        let text = decode_output(stdout, b"");
        assert!(text.contains('\u{FFFD}'));

        let result = parse_ping_output(&text, PingPlatform::Windows);
        assert_eq!(result.rtt_ms, 11.0);
        assert_eq!(result.packet_loss_percent, 0.0);
    }

    #[test]
    fn test_parse_unrecognized_output_is_nan() {
        let result = parse_ping_output("bonjour le monde\n", PingPlatform::Unix);
        assert!(result.rtt_ms.is_nan());
        assert!(result.packet_loss_percent.is_nan());

        // Wrong dialect degrades the same way.
        let result = parse_ping_output(LINUX_OK, PingPlatform::Windows);
        assert!(result.rtt_ms.is_nan());
        assert!(result.packet_loss_percent.is_nan());
    }

    #[test]
    fn test_failed_sentinel() {
        let result = PingResult::failed();
        assert!(result.is_failure());
        assert!(!PingResult::new(1.0, 100.0).is_failure());
    }

    #[test]
    fn test_ping_config_builder() {
        let config = PingConfig::default()
            .with_count(2)
            .with_timeout(Duration::from_secs(3))
            .with_program("/usr/bin/ping");
        assert_eq!(config.count, 2);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.program, "/usr/bin/ping");
    }

    #[test]
    fn test_command_arguments() {
        let probe = SystemPing::new(PingConfig::default()).with_platform(PingPlatform::Windows);
        let cmd = probe.command("example.test");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["-n", "4", "example.test"]);

        let probe = SystemPing::new(PingConfig::default()).with_platform(PingPlatform::Unix);
        let cmd = probe.command("example.test");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["-c", "4", "example.test"]);
    }

    #[tokio::test]
    async fn test_missing_binary_yields_failure_sentinel() {
        let probe = SystemPing::new(
            PingConfig::default().with_program("/nonexistent/definitely-not-ping"),
        );
        let target = Target::parse("http://example.test").unwrap();
        assert!(probe.probe(&target).await.is_failure());
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_parses_successful_output() {
        let probe = SystemPing::new(PingConfig::default()).with_platform(PingPlatform::Unix);
        let script = format!("printf '%s' '{LINUX_OK}'");
        let result = probe.execute(shell(&script)).await.unwrap();
        assert_eq!(result.rtt_ms, 12.3);
        assert_eq!(result.packet_loss_percent, 0.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_nonzero_exit_is_error() {
        let probe = SystemPing::new(PingConfig::default()).with_platform(PingPlatform::Unix);
        let result = probe.execute(shell(&format!("printf '%s' '{LINUX_ERRORS}'; exit 1"))).await;
        assert!(matches!(result, Err(ProbeError::ExitStatus { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout_is_error() {
        let probe = SystemPing::new(
            PingConfig::default().with_timeout(Duration::from_millis(100)),
        );
        let result = probe.execute(shell("sleep 5")).await;
        assert!(matches!(result, Err(ProbeError::Timeout(_))));
    }
}

//! HTTP endpoint probe.
//!
//! Issues one timed GET and reports the elapsed time together with the
//! response status, or a sentinel status when no response arrived.

use std::time::{Duration, Instant};

use reqwest::{Client, redirect};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use super::{ProbeError, Target, nan_as_null};

/// Default request timeout (5 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Redirects followed before giving up. Matches the reqwest default, pinned
/// here so the policy does not drift with client upgrades.
pub const MAX_REDIRECTS: usize = 10;

/// Status reported when the request timed out.
pub const STATUS_TIMEOUT: u16 = 408;

/// Status reported when no HTTP response was obtained.
pub const STATUS_CONNECTION_FAILED: u16 = 0;

/// Outcome of one HTTP probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HttpResult {
    /// Wall-clock time of the request in milliseconds (`NaN` if unmeasurable).
    #[serde(with = "nan_as_null")]
    pub response_time_ms: f64,
    /// Response status, or `0` (connection failure) / `408` (timeout).
    pub status_code: u16,
}

impl HttpResult {
    pub fn new(response_time_ms: f64, status_code: u16) -> Self {
        Self {
            response_time_ms,
            status_code,
        }
    }

    /// Sentinel for a request that could not be attempted: `(NaN, 0)`.
    pub fn unmeasurable() -> Self {
        Self::new(f64::NAN, STATUS_CONNECTION_FAILED)
    }
}

/// Measures HTTP responsiveness of a target.
#[async_trait::async_trait]
pub trait HttpProbe: Send + Sync + 'static {
    /// Probe the target once. Failures are encoded in the status code.
    async fn probe(&self, target: &Target) -> HttpResult;
}

/// [`HttpProbe`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: Client,
    timeout: Duration,
}

impl ReqwestProbe {
    /// Build a probe with the given request timeout.
    ///
    /// # Errors
    /// Returns `ProbeError::Client` if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            timeout: request_timeout,
        })
    }
}

#[async_trait::async_trait]
impl HttpProbe for ReqwestProbe {
    async fn probe(&self, target: &Target) -> HttpResult {
        let url = target.url();

        // The body is drained so the measurement covers the full response.
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            response.bytes().await?;
            Ok::<_, reqwest::Error>(status)
        };

        let start = Instant::now();
        let result = timeout(self.timeout, request).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(Ok(status)) => {
                tracing::debug!(
                    endpoint = %target.label(),
                    url = %url,
                    latency_ms = elapsed_ms,
                    status = status.as_u16(),
                    "HTTP probe completed"
                );
                HttpResult::new(elapsed_ms, status.as_u16())
            }
            Ok(Err(e)) if e.is_timeout() => {
                tracing::warn!(
                    endpoint = %target.label(),
                    url = %url,
                    timeout_ms = self.timeout.as_millis(),
                    "HTTP probe timed out"
                );
                HttpResult::new(elapsed_ms, STATUS_TIMEOUT)
            }
            Ok(Err(e)) if e.is_builder() => {
                tracing::warn!(
                    endpoint = %target.label(),
                    url = %url,
                    error = %e,
                    "HTTP request could not be built"
                );
                HttpResult::unmeasurable()
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    endpoint = %target.label(),
                    url = %url,
                    error = %e,
                    "HTTP probe failed"
                );
                HttpResult::new(elapsed_ms, STATUS_CONNECTION_FAILED)
            }
            Err(_) => {
                tracing::warn!(
                    endpoint = %target.label(),
                    url = %url,
                    timeout_ms = self.timeout.as_millis(),
                    "HTTP probe timed out"
                );
                HttpResult::new(elapsed_ms, STATUS_TIMEOUT)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use tokio::net::TcpListener;

    async fn start_server() -> String {
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/unavailable",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            )
            .route(
                "/redirect",
                get(|| async { axum::response::Redirect::temporary("/ok") }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_success_reports_status_and_latency() {
        let base = start_server().await;
        let probe = ReqwestProbe::new(DEFAULT_HTTP_TIMEOUT).unwrap();

        let result = probe.probe(&Target::parse(format!("{base}/ok")).unwrap()).await;
        assert_eq!(result.status_code, 200);
        assert!(result.response_time_ms.is_finite());
        assert!(result.response_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported_verbatim() {
        let base = start_server().await;
        let probe = ReqwestProbe::new(DEFAULT_HTTP_TIMEOUT).unwrap();

        let result = probe
            .probe(&Target::parse(format!("{base}/unavailable")).unwrap())
            .await;
        assert_eq!(result.status_code, 503);
        assert!(result.response_time_ms.is_finite());
    }

    #[tokio::test]
    async fn test_http_follows_redirects() {
        let base = start_server().await;
        let probe = ReqwestProbe::new(DEFAULT_HTTP_TIMEOUT).unwrap();

        let result = probe
            .probe(&Target::parse(format!("{base}/redirect")).unwrap())
            .await;
        assert_eq!(result.status_code, 200);
    }

    #[tokio::test]
    async fn test_http_timeout_maps_to_408() {
        let base = start_server().await;
        let probe = ReqwestProbe::new(Duration::from_millis(200)).unwrap();

        let result = probe.probe(&Target::parse(format!("{base}/slow")).unwrap()).await;
        assert_eq!(result.status_code, STATUS_TIMEOUT);
        assert!(result.response_time_ms >= 150.0);
        assert!(result.response_time_ms < 3000.0);
    }

    #[tokio::test]
    async fn test_http_connection_refused_maps_to_0() {
        // Reserve a port, then release it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = ReqwestProbe::new(DEFAULT_HTTP_TIMEOUT).unwrap();
        let result = probe
            .probe(&Target::parse(format!("http://{addr}/")).unwrap())
            .await;
        assert_eq!(result.status_code, STATUS_CONNECTION_FAILED);
        assert!(result.response_time_ms.is_finite());
    }

    #[test]
    fn test_unmeasurable_sentinel() {
        let result = HttpResult::unmeasurable();
        assert!(result.response_time_ms.is_nan());
        assert_eq!(result.status_code, 0);
    }
}

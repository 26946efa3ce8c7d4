//! Best-effort persistence of observations.
//!
//! [`PersistenceSink`] connects once at startup, retrying a bounded number of
//! times. If the backend never answers it becomes [`PersistenceState::Disabled`]
//! for the rest of the process and every write is a no-op. Write failures
//! after a successful connect are logged and dropped; they never change state.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──▶ Connected
//!                                  │
//!                                  └──(retries exhausted)──▶ Disabled
//! ```

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::shutdown::Shutdown;
use crate::storage::{DocumentStore, Observation, SqlitePool, StorageError};

/// Default connection attempts before disabling persistence.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay between connection attempts (5 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default bound on a single connection attempt (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "monitor_results";

/// Connection state of a [`PersistenceSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceState {
    /// `connect()` has not been called.
    Disconnected,
    /// Connection attempts in progress.
    Connecting,
    /// Backend reachable; writes are attempted.
    Connected,
    /// Retries exhausted; writes are no-ops for the process lifetime.
    Disabled,
}

impl PersistenceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disabled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Disabled => 3,
        }
    }

    /// Lowercase name for logs and health output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for PersistenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for [`PersistenceSink`].
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Store connection URI.
    pub url: String,
    /// Collection receiving observation documents.
    pub collection: String,
    /// Connection attempts before giving up.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Bound on one attempt.
    pub connect_timeout: Duration,
}

impl PersistenceConfig {
    /// Create a configuration with default retry policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the number of connection attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Receives every observation for durable storage.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync + 'static {
    /// Store an observation. Must not fail or block the round on errors.
    async fn write(&self, observation: &Observation);
}

/// Resilient writer to the document store.
pub struct PersistenceSink {
    config: PersistenceConfig,
    state: AtomicU8,
    store: OnceLock<DocumentStore>,
}

impl std::fmt::Debug for PersistenceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceSink")
            .field("collection", &self.config.collection)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PersistenceSink {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(PersistenceState::Disconnected.as_u8()),
            store: OnceLock::new(),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> PersistenceState {
        PersistenceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PersistenceState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// The connected store, if any.
    pub fn store(&self) -> Option<&DocumentStore> {
        self.store.get()
    }

    /// Connect with bounded retries.
    ///
    /// Only the first call does anything; later calls return the current
    /// state. A triggered `shutdown` abandons the remaining attempts.
    pub async fn connect(&self, mut shutdown: Shutdown) -> PersistenceState {
        if self
            .state
            .compare_exchange(
                PersistenceState::Disconnected.as_u8(),
                PersistenceState::Connecting.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.state();
        }

        let max_retries = self.config.max_retries;
        for attempt in 1..=max_retries {
            tracing::info!(
                attempt,
                max_retries,
                collection = %self.config.collection,
                "Connecting to persistence backend"
            );

            match self.try_connect().await {
                Ok(store) => {
                    // Only reachable once, guarded by the state transition above.
                    let _ = self.store.set(store);
                    self.set_state(PersistenceState::Connected);
                    tracing::info!(collection = %self.config.collection, "Persistence backend connected");
                    return PersistenceState::Connected;
                }
                Err(e) => {
                    tracing::warn!(attempt, max_retries, error = %e, "Persistence connection failed");
                }
            }

            if attempt < max_retries {
                tracing::info!(delay = ?self.config.retry_delay, "Retrying persistence connection");
                tokio::select! {
                    _ = tokio::time::sleep(self.config.retry_delay) => {}
                    _ = shutdown.triggered() => {
                        tracing::warn!("Shutdown requested during persistence connect");
                        break;
                    }
                }
            }
        }

        tracing::error!(
            max_retries,
            "Persistence backend unavailable, continuing without persistence"
        );
        self.set_state(PersistenceState::Disabled);
        PersistenceState::Disabled
    }

    async fn try_connect(&self) -> Result<DocumentStore, StorageError> {
        let pool = SqlitePool::connect(&self.config.url, self.config.connect_timeout).await?;
        pool.ping().await?;
        DocumentStore::open(pool, &self.config.collection).await
    }

    /// Close the store, if connected.
    pub async fn close(&self) {
        if let Some(store) = self.store.get() {
            store.close().await;
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for PersistenceSink {
    async fn write(&self, observation: &Observation) {
        if self.state() != PersistenceState::Connected {
            tracing::debug!(endpoint = %observation.target, "Persistence not connected, skipping write");
            return;
        }
        let Some(store) = self.store.get() else {
            return;
        };

        match store.insert_one(observation).await {
            Ok(id) => {
                tracing::debug!(endpoint = %observation.target, id, "Observation stored");
            }
            Err(e) => {
                tracing::warn!(endpoint = %observation.target, error = %e, "Failed to store observation");
            }
        }
    }
}

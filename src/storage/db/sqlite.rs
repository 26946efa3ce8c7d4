//! SQLite backend implementation using sqlx.
//!
//! Provides connection pooling and the liveness check used at startup.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool as SqlxPool, SqlitePoolOptions,
    SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

use crate::storage::StorageError;

/// Default maximum connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite connection pool wrapper.
///
/// Wraps sqlx's SqlitePool with WAL mode and a bounded acquire timeout.
#[derive(Clone)]
pub struct SqlitePool {
    inner: SqlxPool,
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool").finish_non_exhaustive()
    }
}

impl SqlitePool {
    /// Connect to a SQLite database.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL, e.g., `sqlite:data/webprobe.db?mode=rwc`
    /// * `connect_timeout` - Bound on acquiring the first connection
    ///
    /// # Configuration
    ///
    /// - WAL journal mode for better concurrency
    /// - Normal synchronous mode for performance with durability
    /// - Create database if not exists
    /// - In-memory databases use a single connection so every query sees
    ///   the same data
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let max_connections = if url.contains(":memory:") || url.contains("mode=memory") {
            1
        } else {
            DEFAULT_MAX_CONNECTIONS
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect_with(options)
            .await?;

        Ok(Self { inner: pool })
    }

    /// Liveness check: a round trip through the pool.
    pub async fn ping(&self) -> Result<(), StorageError> {
        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.inner).await?;
        if one != 1 {
            return Err(StorageError::InvalidData(format!(
                "liveness check returned {one}"
            )));
        }
        Ok(())
    }

    /// Get the underlying sqlx pool for direct query execution.
    #[inline]
    pub fn inner(&self) -> &SqlxPool {
        &self.inner
    }

    /// Close the connection pool gracefully.
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Check if the pool is closed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

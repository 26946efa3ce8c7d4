//! Document collection on top of a [`SqlitePool`].
//!
//! Each document is stored verbatim as JSON. `ts` (Unix micros) and `target`
//! are copied into columns so history queries can use an index.

use crate::storage::{Observation, SqlitePool, StorageError};

/// Default number of documents returned by history queries.
const DEFAULT_LIMIT: u32 = 100;

/// Upper bound on documents returned by one history query.
const MAX_LIMIT: u32 = 10_000;

/// Check that a collection name is a plain identifier.
///
/// The name is interpolated into DDL, so only `[A-Za-z_][A-Za-z0-9_]*` is
/// accepted.
pub fn validate_collection_name(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidData(format!(
            "invalid collection name: '{name}'"
        )))
    }
}

/// A single collection of observation documents.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    collection: String,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Open a collection, creating it if needed.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidData` for a bad collection name, or a
    /// database error if the DDL fails.
    pub async fn open(pool: SqlitePool, collection: &str) -> Result<Self, StorageError> {
        validate_collection_name(collection)?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                ts       INTEGER NOT NULL,
                target   TEXT NOT NULL,
                document TEXT NOT NULL
            )"
        ))
        .execute(pool.inner())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{collection}_target_ts ON {collection} (target, ts)"
        ))
        .execute(pool.inner())
        .await?;

        Ok(Self {
            pool,
            collection: collection.to_string(),
        })
    }

    /// Collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Liveness check on the underlying pool.
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.pool.ping().await
    }

    /// Insert one document. Returns its row id.
    pub async fn insert_one(&self, observation: &Observation) -> Result<i64, StorageError> {
        let document = serde_json::to_string(observation)?;
        let result = sqlx::query(&format!(
            "INSERT INTO {} (ts, target, document) VALUES (?, ?, ?)",
            self.collection
        ))
        .bind(observation.timestamp.timestamp_micros())
        .bind(&observation.target)
        .bind(document)
        .execute(self.pool.inner())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent documents for a target label, newest first.
    pub async fn find_by_target(
        &self,
        target: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Observation>, StorageError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT document FROM {} WHERE target = ? ORDER BY ts DESC, id DESC LIMIT ?",
            self.collection
        ))
        .bind(target)
        .bind(i64::from(limit))
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter()
            .map(|(doc,)| serde_json::from_str(&doc).map_err(StorageError::from))
            .collect()
    }

    /// Number of documents in the collection.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let (count,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", self.collection))
                .fetch_one(self.pool.inner())
                .await?;
        Ok(count)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

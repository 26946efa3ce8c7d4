//! Storage Layer
//!
//! Durable history of observations in a document collection, behind a
//! best-effort writer:
//! - **DocumentStore**: one collection of JSON documents on a sqlx pool
//! - **PersistenceSink**: connect-with-retry state machine; degrades to a
//!   no-op writer when the backend never becomes reachable
//!
//! # Components
//!
//! - [`Observation`]: the document written once per target per round
//! - [`DocumentStore`]: insert and query documents
//! - [`PersistenceSink`] / [`PersistenceConfig`] / [`PersistenceState`]
//! - [`RecordSink`]: the seam used by the collector

pub mod db;
mod error;
mod persistence;
mod types;

pub use db::{DocumentStore, SqlitePool};
pub use error::StorageError;
pub use persistence::{
    DEFAULT_COLLECTION, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
    PersistenceConfig, PersistenceSink, PersistenceState, RecordSink,
};
pub use types::Observation;

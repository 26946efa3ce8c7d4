//! Database abstraction layer.
//!
//! Currently supports SQLite through sqlx. A collection is a table of JSON
//! documents with the timestamp and target lifted into indexed columns.
//!
//! # Example
//!
//! ```ignore
//! let pool = SqlitePool::connect("sqlite:data/webprobe.db?mode=rwc", timeout).await?;
//! pool.ping().await?;
//! let store = DocumentStore::open(pool, "monitor_results").await?;
//! ```

mod document;
mod sqlite;

pub use document::{DocumentStore, validate_collection_name};
pub use sqlite::SqlitePool;

//! Storage traits and error types
//!
//! Two layers are defined here. [`CrawlQueue`] and [`CrawlHistory`] are the
//! thread-safe contracts the crawler talks to. [`QueueStore`] and
//! [`HistoryStore`] are the plain primitives a backend implements; the
//! wrappers in `locked.rs` add the synchronization on top of them.

use crate::model::QueueEntry;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid history key: {0:?}")]
    InvalidKey(String),

    #[error("Corrupt storage: {0}")]
    Corrupt(String),

    #[error("{0} storage needs a path")]
    MissingPath(&'static str),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Work queue of admitted entries awaiting download
///
/// Implementations must be safe to use from many tasks at once. Each entry
/// pushed is returned by `pop` exactly once.
pub trait CrawlQueue: Send + Sync {
    /// Number of entries currently queued
    fn count(&self) -> StorageResult<u64>;

    /// Appends an entry
    fn push(&self, entry: QueueEntry) -> StorageResult<()>;

    /// Removes and returns the next entry, or `None` when empty
    fn pop(&self) -> StorageResult<Option<QueueEntry>>;
}

/// Set of dedup keys already admitted to the crawl
pub trait CrawlHistory: Send + Sync {
    /// Number of distinct keys registered
    fn registered_count(&self) -> StorageResult<u64>;

    /// Registers a key
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The key was new and has been recorded
    /// * `Ok(false)` - The key was already present
    ///
    /// Concurrent callers registering the same key see exactly one `true`.
    fn register(&self, key: &str) -> StorageResult<bool>;
}

/// Backend primitives for a queue, without synchronization
pub trait QueueStore: Send + Sync {
    fn len(&self) -> StorageResult<u64>;

    fn push_entry(&mut self, entry: QueueEntry) -> StorageResult<()>;

    fn pop_entry(&mut self) -> StorageResult<Option<QueueEntry>>;
}

/// Backend primitives for a history set, without synchronization
pub trait HistoryStore: Send + Sync {
    fn len(&self) -> StorageResult<u64>;

    fn contains(&self, key: &str) -> StorageResult<bool>;

    fn insert(&mut self, key: &str) -> StorageResult<()>;
}

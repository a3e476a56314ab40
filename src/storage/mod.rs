//! Storage module for Ripple-Crawl
//!
//! Provides the work queue and the dedup history, with interchangeable
//! in-memory, file and SQLite backends. Persistent backends are namespaced by
//! crawl id so that a crawl can be resumed.

mod file;
mod locked;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use file::{FileHistory, FileQueue};
pub use locked::{LockedHistory, LockedQueue};
pub use memory::{MemoryHistory, MemoryQueue};
pub use schema::initialize_schema;
pub use sqlite::{SqliteHistory, SqliteQueue};
pub use traits::{
    CrawlHistory, CrawlQueue, HistoryStore, QueueStore, StorageError, StorageResult,
};

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Opens the queue and history selected by the storage configuration
///
/// # Arguments
///
/// * `config` - The storage section of the configuration
/// * `crawl_id` - Identity of the crawl, see [`crate::model::crawl_id`]
/// * `resume` - Keep persisted state when true
///
/// # Returns
///
/// * `Ok((queue, history))` - Ready-to-use, thread-safe storage
/// * `Err(StorageError)` - The backend could not be opened
pub fn open_storage(
    config: &StorageConfig,
    crawl_id: &str,
    resume: bool,
) -> StorageResult<(Arc<dyn CrawlQueue>, Arc<dyn CrawlHistory>)> {
    match config.backend {
        StorageBackend::Memory => Ok((
            Arc::new(LockedQueue::new(MemoryQueue::default())),
            Arc::new(LockedHistory::new(MemoryHistory::default())),
        )),
        StorageBackend::File => {
            let path = config.path.as_deref().ok_or(StorageError::MissingPath("file"))?;
            Ok((
                Arc::new(LockedQueue::new(FileQueue::open(path, crawl_id, resume)?)),
                Arc::new(LockedHistory::new(FileHistory::open(
                    path, crawl_id, resume,
                )?)),
            ))
        }
        StorageBackend::Sqlite => {
            let path = config.path.as_deref().ok_or(StorageError::MissingPath("sqlite"))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok((
                Arc::new(LockedQueue::new(SqliteQueue::open(path, crawl_id, resume)?)),
                Arc::new(LockedHistory::new(SqliteHistory::open(
                    path, crawl_id, resume,
                )?)),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistent_backend_without_path_fails() {
        for backend in [StorageBackend::File, StorageBackend::Sqlite] {
            let config = StorageConfig {
                backend,
                path: None,
            };
            assert!(matches!(
                open_storage(&config, "crawl", false),
                Err(StorageError::MissingPath(_))
            ));
        }
    }

    #[test]
    fn test_memory_backend_needs_no_path() {
        let (queue, history) = open_storage(&StorageConfig::default(), "crawl", true).unwrap();
        assert_eq!(queue.count().unwrap(), 0);
        assert_eq!(history.registered_count().unwrap(), 0);
    }
}

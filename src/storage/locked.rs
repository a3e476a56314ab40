//! Reader/writer synchronization shared by every backend

use crate::model::QueueEntry;
use crate::storage::traits::{
    CrawlHistory, CrawlQueue, HistoryStore, QueueStore, StorageError, StorageResult,
};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Wraps a [`QueueStore`] so that counts take a shared lock and
/// push/pop take an exclusive one
#[derive(Debug)]
pub struct LockedQueue<S> {
    inner: RwLock<S>,
}

impl<S: QueueStore> LockedQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, S> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: QueueStore> CrawlQueue for LockedQueue<S> {
    fn count(&self) -> StorageResult<u64> {
        self.read().len()
    }

    fn push(&self, entry: QueueEntry) -> StorageResult<()> {
        self.write().push_entry(entry)
    }

    fn pop(&self) -> StorageResult<Option<QueueEntry>> {
        self.write().pop_entry()
    }
}

/// Wraps a [`HistoryStore`] with check-then-insert registration
///
/// Registration looks the key up under a shared lock first, then re-checks
/// under the exclusive lock before inserting, so concurrent registrations of
/// one key produce a single `true`.
#[derive(Debug)]
pub struct LockedHistory<S> {
    inner: RwLock<S>,
}

impl<S: HistoryStore> LockedHistory<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, S> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, S> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: HistoryStore> CrawlHistory for LockedHistory<S> {
    fn registered_count(&self) -> StorageResult<u64> {
        self.read().len()
    }

    fn register(&self, key: &str) -> StorageResult<bool> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        if self.read().contains(key)? {
            return Ok(false);
        }

        let mut store = self.write();
        if store.contains(key)? {
            return Ok(false);
        }
        store.insert(key)?;
        Ok(true)
    }
}

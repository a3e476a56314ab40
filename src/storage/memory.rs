//! In-memory backends
//!
//! Nothing survives the process, so a resumed crawl on these backends starts
//! from an empty queue and history.

use crate::model::QueueEntry;
use crate::storage::traits::{HistoryStore, QueueStore, StorageResult};
use std::collections::{HashSet, VecDeque};

/// FIFO queue held in memory
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: VecDeque<QueueEntry>,
}

impl QueueStore for MemoryQueue {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.entries.len() as u64)
    }

    fn push_entry(&mut self, entry: QueueEntry) -> StorageResult<()> {
        self.entries.push_back(entry);
        Ok(())
    }

    fn pop_entry(&mut self) -> StorageResult<Option<QueueEntry>> {
        Ok(self.entries.pop_front())
    }
}

/// History set held in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    keys: HashSet<String>,
}

impl HistoryStore for MemoryHistory {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.keys.len() as u64)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.keys.contains(key))
    }

    fn insert(&mut self, key: &str) -> StorageResult<()> {
        self.keys.insert(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CrawlStep;
    use crate::storage::{CrawlHistory, CrawlQueue, LockedHistory, LockedQueue};
    use url::Url;

    fn entry(url: &str) -> QueueEntry {
        QueueEntry::new(CrawlStep::new(Url::parse(url).unwrap(), 0), None)
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = LockedQueue::new(MemoryQueue::default());
        queue.push(entry("http://a.test/1")).unwrap();
        queue.push(entry("http://a.test/2")).unwrap();

        assert_eq!(queue.count().unwrap(), 2);
        assert_eq!(
            queue.pop().unwrap().unwrap().step.url().as_str(),
            "http://a.test/1"
        );
        assert_eq!(
            queue.pop().unwrap().unwrap().step.url().as_str(),
            "http://a.test/2"
        );
        assert!(queue.pop().unwrap().is_none());
        assert_eq!(queue.count().unwrap(), 0);
    }

    #[test]
    fn test_history_registers_once() {
        let history = LockedHistory::new(MemoryHistory::default());
        assert!(history.register("http://a.test/").unwrap());
        assert!(!history.register("http://a.test/").unwrap());
        assert!(history.register("http://a.test/x").unwrap());
        assert_eq!(history.registered_count().unwrap(), 2);
    }
}

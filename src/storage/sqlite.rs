//! SQLite backends
//!
//! The queue and the history each hold their own connection, so both can point
//! at the same database file. Rows are namespaced by crawl id.

use crate::model::QueueEntry;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{HistoryStore, QueueStore, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opens a connection configured for crawl storage
fn open_connection(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
    ",
    )?;

    initialize_schema(&conn)?;
    Ok(conn)
}

/// Durable FIFO queue stored in the `queue_entries` table
#[derive(Debug)]
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    crawl_id: String,
}

impl SqliteQueue {
    /// Opens the queue for a crawl
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `crawl_id` - Identity of the crawl
    /// * `resume` - Keep existing rows when true, delete them otherwise
    pub fn open(path: &Path, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        Self::with_connection(open_connection(path)?, crawl_id, resume)
    }

    /// Creates a queue backed by an in-memory database
    pub fn open_in_memory(crawl_id: &str) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Self::with_connection(conn, crawl_id, false)
    }

    fn with_connection(conn: Connection, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        if !resume {
            conn.execute(
                "DELETE FROM queue_entries WHERE crawl_id = ?1",
                params![crawl_id],
            )?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            crawl_id: crawl_id.to_string(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueueStore for SqliteQueue {
    fn len(&self) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM queue_entries WHERE crawl_id = ?1",
            params![self.crawl_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn push_entry(&mut self, entry: QueueEntry) -> StorageResult<()> {
        let json = serde_json::to_string(&entry)?;
        self.conn().execute(
            "INSERT INTO queue_entries (crawl_id, entry, queued_at) VALUES (?1, ?2, ?3)",
            params![self.crawl_id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn pop_entry(&mut self) -> StorageResult<Option<QueueEntry>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let row: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, entry FROM queue_entries WHERE crawl_id = ?1 ORDER BY id LIMIT 1",
                params![self.crawl_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((id, json)) = row else {
            return Ok(None);
        };

        tx.execute("DELETE FROM queue_entries WHERE id = ?1", params![id])?;
        tx.commit()?;

        Ok(Some(serde_json::from_str(&json)?))
    }
}

/// Durable history set stored in the `history_keys` table
#[derive(Debug)]
pub struct SqliteHistory {
    conn: Mutex<Connection>,
    crawl_id: String,
}

impl SqliteHistory {
    /// Opens the history for a crawl
    ///
    /// See [`SqliteQueue::open`] for the meaning of the arguments.
    pub fn open(path: &Path, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        Self::with_connection(open_connection(path)?, crawl_id, resume)
    }

    /// Creates a history backed by an in-memory database
    pub fn open_in_memory(crawl_id: &str) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Self::with_connection(conn, crawl_id, false)
    }

    fn with_connection(conn: Connection, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        if !resume {
            conn.execute(
                "DELETE FROM history_keys WHERE crawl_id = ?1",
                params![crawl_id],
            )?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
            crawl_id: crawl_id.to_string(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HistoryStore for SqliteHistory {
    fn len(&self) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM history_keys WHERE crawl_id = ?1",
            params![self.crawl_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM history_keys WHERE crawl_id = ?1 AND key = ?2",
                params![self.crawl_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&mut self, key: &str) -> StorageResult<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO history_keys (crawl_id, key, registered_at) VALUES (?1, ?2, ?3)",
            params![self.crawl_id, key, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CrawlStep;
    use crate::storage::{CrawlHistory, LockedHistory};
    use serde_json::json;
    use tempfile::TempDir;
    use url::Url;

    fn entry(url: &str) -> QueueEntry {
        QueueEntry::new(CrawlStep::new(Url::parse(url).unwrap(), 1), None)
    }

    #[test]
    fn test_queue_round_trip_in_order() {
        let mut queue = SqliteQueue::open_in_memory("crawl").unwrap();
        let mut first = entry("http://a.test/1");
        first
            .properties
            .insert("source".to_string(), json!("seed-page"));

        queue.push_entry(first.clone()).unwrap();
        queue.push_entry(entry("http://a.test/2")).unwrap();
        assert_eq!(queue.len().unwrap(), 2);

        assert_eq!(queue.pop_entry().unwrap(), Some(first));
        assert_eq!(
            queue.pop_entry().unwrap().unwrap().step.url().as_str(),
            "http://a.test/2"
        );
        assert!(queue.pop_entry().unwrap().is_none());
    }

    #[test]
    fn test_queue_and_history_share_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let mut queue = SqliteQueue::open(&path, "crawl", false).unwrap();
            let history = LockedHistory::new(SqliteHistory::open(&path, "crawl", false).unwrap());
            queue.push_entry(entry("http://c.test/")).unwrap();
            assert!(history.register("http://c.test/").unwrap());
        }

        let mut queue = SqliteQueue::open(&path, "crawl", true).unwrap();
        let history = LockedHistory::new(SqliteHistory::open(&path, "crawl", true).unwrap());
        assert_eq!(queue.len().unwrap(), 1);
        assert!(!history.register("http://c.test/").unwrap());
        assert_eq!(
            queue.pop_entry().unwrap().unwrap().step.url().as_str(),
            "http://c.test/"
        );
    }

    #[test]
    fn test_fresh_open_clears_only_own_crawl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let mut mine = SqliteQueue::open(&path, "mine", false).unwrap();
            let mut other = SqliteQueue::open(&path, "other", false).unwrap();
            mine.push_entry(entry("http://a.test/")).unwrap();
            other.push_entry(entry("http://b.test/")).unwrap();
        }

        let mine = SqliteQueue::open(&path, "mine", false).unwrap();
        let other = SqliteQueue::open(&path, "other", true).unwrap();
        assert_eq!(mine.len().unwrap(), 0);
        assert_eq!(other.len().unwrap(), 1);
    }
}

//! File-system backends
//!
//! Each crawl gets a directory named after its crawl id. Queue entries are
//! stored one JSON document per file, named by a zero-padded sequence number so
//! that directory order is queue order. History keys are stored one file per
//! key, named by the SHA-256 of the key.

use crate::model::QueueEntry;
use crate::storage::traits::{HistoryStore, QueueStore, StorageError, StorageResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ENTRY_EXTENSION: &str = "json";

/// Durable FIFO queue stored as one file per entry
#[derive(Debug)]
pub struct FileQueue {
    dir: PathBuf,
    pending: BTreeSet<u64>,
    next_seq: u64,
}

impl FileQueue {
    /// Opens the queue directory for a crawl
    ///
    /// # Arguments
    ///
    /// * `root` - Base directory for all crawl storage
    /// * `crawl_id` - Identity of the crawl
    /// * `resume` - Keep existing entries when true, start empty otherwise
    pub fn open(root: &Path, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        let dir = root.join(crawl_id).join("queue");
        prepare_dir(&dir, resume)?;

        let mut pending = BTreeSet::new();
        for item in fs::read_dir(&dir)? {
            let path = item?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(seq) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                pending.insert(seq);
            }
        }

        let next_seq = pending.last().map_or(0, |last| last + 1);
        tracing::debug!(
            "Opened file queue at {} with {} entries",
            dir.display(),
            pending.len()
        );

        Ok(Self {
            dir,
            pending,
            next_seq,
        })
    }

    fn entry_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{:020}.{}", seq, ENTRY_EXTENSION))
    }
}

impl QueueStore for FileQueue {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.pending.len() as u64)
    }

    fn push_entry(&mut self, entry: QueueEntry) -> StorageResult<()> {
        let seq = self.next_seq;
        let path = self.entry_path(seq);
        let staging = path.with_extension("tmp");

        fs::write(&staging, serde_json::to_vec(&entry)?)?;
        fs::rename(&staging, &path)?;

        self.next_seq += 1;
        self.pending.insert(seq);
        Ok(())
    }

    fn pop_entry(&mut self) -> StorageResult<Option<QueueEntry>> {
        let Some(seq) = self.pending.pop_first() else {
            return Ok(None);
        };

        let path = self.entry_path(seq);
        let content = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                StorageError::Corrupt(format!("queue entry {} disappeared", path.display()))
            }
            _ => StorageError::Io(e),
        })?;
        fs::remove_file(&path)?;

        Ok(Some(serde_json::from_slice(&content)?))
    }
}

/// Durable history set stored as one file per key
#[derive(Debug)]
pub struct FileHistory {
    dir: PathBuf,
    count: u64,
}

impl FileHistory {
    /// Opens the history directory for a crawl
    ///
    /// See [`FileQueue::open`] for the meaning of the arguments.
    pub fn open(root: &Path, crawl_id: &str, resume: bool) -> StorageResult<Self> {
        let dir = root.join(crawl_id).join("history");
        prepare_dir(&dir, resume)?;

        let mut count = 0;
        for item in fs::read_dir(&dir)? {
            if item?.file_type()?.is_file() {
                count += 1;
            }
        }

        Ok(Self { dir, count })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.dir.join(hex::encode(hasher.finalize()))
    }
}

impl HistoryStore for FileHistory {
    fn len(&self) -> StorageResult<u64> {
        Ok(self.count)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.key_path(key).is_file())
    }

    fn insert(&mut self, key: &str) -> StorageResult<()> {
        fs::write(self.key_path(key), key)?;
        self.count += 1;
        Ok(())
    }
}

/// Creates a storage directory, clearing it first unless resuming
fn prepare_dir(dir: &Path, resume: bool) -> StorageResult<()> {
    if !resume {
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

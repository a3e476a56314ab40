use crate::config::Config;
use crate::crawler::{CrawlObserver, TracingObserver};
use crate::download::{Downloader, HttpDownloader};
use crate::model::crawl_id;
use crate::rules::{AdmissionRules, CrawlerRules};
use crate::storage::{
    open_storage, CrawlHistory, CrawlQueue, LockedHistory, LockedQueue, MemoryHistory, MemoryQueue,
};
use std::sync::Arc;
use url::Url;

/// The collaborators a [`Crawler`](crate::Crawler) is built from
///
/// Every field can be replaced before the crawler is constructed, which is how
/// custom storage, downloaders and rules are plugged in.
#[derive(Clone)]
pub struct CrawlerServices {
    pub queue: Arc<dyn CrawlQueue>,
    pub history: Arc<dyn CrawlHistory>,
    pub downloader: Arc<dyn Downloader>,
    pub rules: Arc<dyn AdmissionRules>,
    pub observer: Arc<dyn CrawlObserver>,
}

impl CrawlerServices {
    /// Bundles the services, reporting events through `tracing`
    pub fn new(
        queue: Arc<dyn CrawlQueue>,
        history: Arc<dyn CrawlHistory>,
        downloader: Arc<dyn Downloader>,
        rules: Arc<dyn AdmissionRules>,
    ) -> Self {
        Self {
            queue,
            history,
            downloader,
            rules,
            observer: Arc::new(TracingObserver),
        }
    }

    /// In-memory storage and unfiltered rules for `seed`
    pub fn in_memory(seed: &Url, downloader: Arc<dyn Downloader>) -> Self {
        Self::new(
            Arc::new(LockedQueue::new(MemoryQueue::default())),
            Arc::new(LockedHistory::new(MemoryHistory::default())),
            downloader,
            Arc::new(CrawlerRules::new(seed.clone())),
        )
    }

    /// Opens storage, builds the HTTP downloader and the admission rules
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlerServices)` - Ready-to-use services
    /// * `Err(RippleError)` - Storage, HTTP client or filter setup failed
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let id = crawl_id(&config.crawler.seed);
        tracing::debug!(
            "Opening {:?} storage for crawl {} (resume: {})",
            config.storage.backend,
            id,
            config.crawler.resume
        );
        let (queue, history) = open_storage(&config.storage, &id, config.crawler.resume)?;

        let downloader: Arc<dyn Downloader> =
            Arc::new(HttpDownloader::new(config.downloader.clone())?);
        let rules = CrawlerRules::from_config(
            &config.crawler,
            &config.downloader.user_agent,
            downloader.clone(),
        )?;

        Ok(Self::new(queue, history, downloader, Arc::new(rules)))
    }

    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CrawlerConfig, StorageBackend, StorageConfig};
    use crate::model::{CrawlStep, QueueEntry};
    use tempfile::TempDir;

    fn file_config(dir: &TempDir, resume: bool) -> Config {
        let mut crawler = CrawlerConfig::new(Url::parse("http://a.test/").unwrap());
        crawler.resume = resume;
        Config {
            crawler,
            downloader: Default::default(),
            storage: StorageConfig {
                backend: StorageBackend::File,
                path: Some(dir.path().to_path_buf()),
            },
        }
    }

    #[test]
    fn test_from_config_scopes_storage_by_seed() {
        let dir = TempDir::new().unwrap();
        let services = CrawlerServices::from_config(&file_config(&dir, false)).unwrap();
        services
            .queue
            .push(QueueEntry::new(
                CrawlStep::new(Url::parse("http://a.test/x").unwrap(), 1),
                None,
            ))
            .unwrap();
        assert!(services.history.register("http://a.test/x").unwrap());
        drop(services);

        let resumed = CrawlerServices::from_config(&file_config(&dir, true)).unwrap();
        assert_eq!(resumed.queue.count().unwrap(), 1);
        assert!(!resumed.history.register("http://a.test/x").unwrap());
        drop(resumed);

        let fresh = CrawlerServices::from_config(&file_config(&dir, false)).unwrap();
        assert_eq!(fresh.queue.count().unwrap(), 0);
        assert_eq!(fresh.history.registered_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = file_config(&dir, false);
        config.crawler.exclude = vec!["(".to_string()];
        assert!(matches!(
            CrawlerServices::from_config(&config),
            Err(crate::RippleError::Config(crate::ConfigError::InvalidPattern(_)))
        ));
    }
}

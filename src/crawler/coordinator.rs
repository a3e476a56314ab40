//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, which coordinates:
//! - Admitting discovered URLs (scheme, depth, rules, dedup) into the queue
//! - Starting downloads while worker slots are free
//! - Running the pipeline over each response before releasing its slot
//! - Observing the crawl time and count limits, cancellation and storage failures
//!
//! Scheduling decisions are made by `process_queue`, which runs after every
//! enqueue and every completed download and never runs concurrently with
//! itself.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::scheduler::Lifecycle;
use crate::crawler::{CrawlObserver, CrawlState, CrawlSummary, CrawlerServices};
use crate::download::{
    spawn_download, DownloadCompletion, DownloadMethod, Downloader, ProgressCallback,
};
use crate::model::{CrawlStep, Properties, QueueEntry};
use crate::pipeline::{PipelineRunner, PipelineStep};
use crate::rules::AdmissionRules;
use crate::storage::{CrawlHistory, CrawlQueue, StorageError, StorageResult};
use crate::url::{is_crawlable_scheme, url_key, UrlSensitivity};
use crate::{ConfigError, ConfigResult, RippleError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Limits and options of a single crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub seed: Url,
    /// Deepest step admitted; 0 means unlimited
    pub max_depth: u32,
    /// Concurrent downloads, each including its pipeline run
    pub max_threads: usize,
    pub max_crawl_time: Option<Duration>,
    pub max_crawl_count: Option<u64>,
    /// Components that make two URLs the same page
    pub sensitivity: UrlSensitivity,
    pub method: DownloadMethod,
}

impl CrawlSettings {
    /// Settings for an unlimited, single-threaded crawl of `seed`
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            max_depth: 0,
            max_threads: 1,
            max_crawl_time: None,
            max_crawl_count: None,
            sensitivity: UrlSensitivity::default(),
            method: DownloadMethod::Get,
        }
    }

    /// Reads the settings from the crawler section of the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSettings)` - The settings
    /// * `Err(ConfigError::Validation)` - The URL sensitivity list is invalid
    pub fn from_config(config: &CrawlerConfig) -> ConfigResult<Self> {
        let sensitivity = config
            .sensitivity()
            .map_err(|e| ConfigError::Validation(format!("url-sensitivity: {}", e)))?;

        Ok(Self {
            seed: config.seed.clone(),
            max_depth: config.max_depth,
            max_threads: config.max_threads.max(1),
            max_crawl_time: config.max_crawl_time(),
            max_crawl_count: config.max_crawl_count,
            sensitivity,
            method: DownloadMethod::Get,
        })
    }
}

/// The crawl orchestrator
///
/// A `Crawler` is a cheap handle; clones share the same crawl. Pipeline steps
/// receive one so they can feed discovered URLs back through
/// [`add_step`](Crawler::add_step). Each crawler runs exactly once.
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<CrawlerInner>,
}

struct CrawlerInner {
    settings: CrawlSettings,
    queue: Arc<dyn CrawlQueue>,
    history: Arc<dyn CrawlHistory>,
    downloader: Arc<dyn Downloader>,
    rules: Arc<dyn AdmissionRules>,
    observer: Arc<dyn CrawlObserver>,
    pipeline: PipelineRunner,
    lifecycle: Mutex<Lifecycle>,
    slots: Arc<Semaphore>,
    visited: AtomicU64,
    download_errors: AtomicU64,
    stopped: Notify,
}

/// Carried through each download and released once its pipeline has run
type DownloadTicket = (Properties, WorkerSlot);

/// A held download slot
///
/// Dropping it frees the permit and re-enters the scheduler, also when the
/// download task unwinds from a panic.
struct WorkerSlot {
    crawler: Crawler,
    permit: Option<OwnedSemaphorePermit>,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        drop(self.permit.take());
        if tokio::runtime::Handle::try_current().is_ok() {
            self.crawler.process_queue();
        }
    }
}

impl Crawler {
    /// Creates a crawler from its settings, services and pipeline
    ///
    /// # Arguments
    ///
    /// * `settings` - Seed and limits
    /// * `services` - Queue, history, downloader, rules and observer
    /// * `pipeline` - Steps run in order over every response
    pub fn new(
        settings: CrawlSettings,
        services: CrawlerServices,
        pipeline: Vec<Arc<dyn PipelineStep>>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(settings.max_threads));

        Self {
            inner: Arc::new(CrawlerInner {
                settings,
                queue: services.queue,
                history: services.history,
                downloader: services.downloader,
                rules: services.rules,
                observer: services.observer,
                pipeline: PipelineRunner::new(pipeline),
                lifecycle: Mutex::new(Lifecycle::new()),
                slots,
                visited: AtomicU64::new(0),
                download_errors: AtomicU64::new(0),
                stopped: Notify::new(),
            }),
        }
    }

    /// Creates a crawler with the storage, downloader and rules the
    /// configuration describes
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(RippleError)` - Storage could not be opened or the
    ///   configuration is inconsistent
    pub fn from_config(config: &Config, pipeline: Vec<Arc<dyn PipelineStep>>) -> crate::Result<Self> {
        let settings = CrawlSettings::from_config(&config.crawler)?;
        let services = CrawlerServices::from_config(config)?;
        Ok(Self::new(settings, services, pipeline))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.inner.settings
    }

    pub fn seed(&self) -> &Url {
        &self.inner.settings.seed
    }

    pub fn state(&self) -> CrawlState {
        self.lifecycle().state()
    }

    /// Downloads started so far
    pub fn visited(&self) -> u64 {
        self.inner.visited.load(Ordering::SeqCst)
    }

    /// Downloads that ended without a response
    pub fn download_errors(&self) -> u64 {
        self.inner.download_errors.load(Ordering::SeqCst)
    }

    /// Downloads currently holding a worker slot
    pub fn in_flight(&self) -> usize {
        self.inner
            .settings
            .max_threads
            .saturating_sub(self.inner.slots.available_permits())
    }

    pub fn queue(&self) -> &Arc<dyn CrawlQueue> {
        &self.inner.queue
    }

    pub fn history(&self) -> &Arc<dyn CrawlHistory> {
        &self.inner.history
    }

    /// Runs the crawl until it stops
    ///
    /// When the queue already holds entries (a resumed crawl) they are drained
    /// directly; otherwise the seed is admitted at depth 0.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The crawl reached `Stopped`
    /// * `Err(RippleError::InvalidOperation)` - The crawler was already run
    /// * `Err(RippleError::Storage)` - The queue or history failed; the crawl
    ///   stopped early
    pub async fn crawl(&self) -> crate::Result<CrawlSummary> {
        self.lifecycle().begin()?;
        tracing::info!(
            "Crawling {} with up to {} concurrent downloads",
            self.seed(),
            self.inner.settings.max_threads
        );

        if let Some(limit) = self.inner.settings.max_crawl_time {
            self.spawn_deadline(limit);
        }

        let pending = match self.inner.queue.count() {
            Ok(pending) => pending,
            Err(error) => {
                self.abort(error);
                0
            }
        };

        if pending > 0 {
            tracing::info!("Resuming with {} queued entries", pending);
            self.process_queue();
        } else if self.state() == CrawlState::Crawling {
            let seed = self.seed().clone();
            if let Err(e) = self.add_step(seed, 0, None, Properties::new()).await {
                tracing::debug!("Seed was not queued: {}", e);
            }
        }

        self.wait_until_stopped().await;
        self.finish_report()
    }

    /// Offers a URL to the crawl
    ///
    /// The URL is queued only if its scheme is http(s), it is not deeper than
    /// the maximum depth, the admission rules allow it and it was not seen
    /// before. Rejections are silent, except that a rejected seed (depth 0)
    /// stops the crawl. While the crawl is stopping nothing is queued.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to crawl
    /// * `depth` - Link distance from the seed
    /// * `referrer` - The step the URL was found on
    /// * `properties` - Values copied into the property bag of this URL's download
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL was queued or silently rejected
    /// * `Err(RippleError::InvalidOperation)` - The crawl has not started
    /// * `Err(RippleError::Aborted)` - Storage failed; the crawl is stopping
    pub async fn add_step(
        &self,
        url: Url,
        depth: u32,
        referrer: Option<&CrawlStep>,
        properties: Properties,
    ) -> crate::Result<()> {
        match self.state() {
            CrawlState::Idle => {
                return Err(RippleError::InvalidOperation(
                    "steps can only be added to a running crawl".to_string(),
                ))
            }
            CrawlState::Crawling => {}
            state => {
                tracing::trace!("Ignored {}: crawl is {}", url, state);
                return Ok(());
            }
        }

        if !self.admit(&url, depth, referrer).await? {
            if depth == 0 {
                tracing::info!("Seed {} was rejected, stopping", url);
                self.stop();
            }
            return Ok(());
        }

        let is_external = self.inner.rules.is_external_url(&url);
        let step = CrawlStep::with_flags(url, depth, true, is_external);
        tracing::debug!("Queued {} at depth {}", step.url(), depth);

        let entry = QueueEntry::new(step, referrer.cloned()).with_properties(properties);
        if let Err(error) = self.inner.queue.push(entry) {
            return Err(self.abort(error));
        }

        self.process_queue();
        Ok(())
    }

    /// Requests cancellation
    ///
    /// No new downloads start; in-flight downloads and their pipeline runs
    /// finish normally and the crawl then stops.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Cancellation was requested
    /// * `Err(RippleError::AlreadyCancelled)` - It was requested before
    /// * `Err(RippleError::InvalidOperation)` - The crawl is not running
    pub fn cancel(&self) -> crate::Result<()> {
        self.lifecycle().request_cancel()?;
        tracing::info!("Cancelling crawl of {}", self.seed());
        self.process_queue();
        Ok(())
    }

    /// Applies the checks every URL must pass before it is queued
    async fn admit(&self, url: &Url, depth: u32, referrer: Option<&CrawlStep>) -> crate::Result<bool> {
        if !is_crawlable_scheme(url) {
            tracing::trace!("Rejected {}: not http(s)", url);
            return Ok(false);
        }

        let max_depth = self.inner.settings.max_depth;
        if max_depth > 0 && depth > max_depth {
            tracing::trace!("Rejected {}: depth {} exceeds {}", url, depth, max_depth);
            return Ok(false);
        }

        if !self.inner.rules.is_allowed_url(url, referrer).await {
            return Ok(false);
        }

        let key = url_key(url, self.inner.settings.sensitivity);
        match self.inner.history.register(&key) {
            Ok(true) => Ok(true),
            Ok(false) => {
                tracing::trace!("Rejected {}: already registered", url);
                Ok(false)
            }
            Err(error) => Err(self.abort(error)),
        }
    }

    /// Makes the next scheduling decision
    fn process_queue(&self) {
        let mut lifecycle = self.lifecycle();
        if matches!(lifecycle.state(), CrawlState::Idle | CrawlState::Stopped) {
            return;
        }

        if let Err(error) = self.schedule(&mut lifecycle) {
            lifecycle.record_fatal(error);
            lifecycle.request_stop();
        }

        if self.in_flight() > 0 {
            return;
        }

        let drained = lifecycle.state().is_draining()
            || match self.inner.queue.count() {
                Ok(pending) => pending == 0,
                Err(error) => {
                    lifecycle.record_fatal(error);
                    true
                }
            };

        if drained && lifecycle.finish() {
            tracing::info!("Crawl of {} stopped after {:?}", self.seed(), lifecycle.elapsed());
            self.inner.stopped.notify_waiters();
        }
    }

    /// Checks the limits, then fills free worker slots from the queue
    fn schedule(&self, lifecycle: &mut Lifecycle) -> StorageResult<()> {
        if lifecycle.state() != CrawlState::Crawling {
            return Ok(());
        }

        if let Some(limit) = self.inner.settings.max_crawl_time {
            if lifecycle.elapsed() >= limit {
                tracing::info!("Maximum crawl time of {:?} reached", limit);
                lifecycle.request_stop();
                return Ok(());
            }
        }

        // In-flight pages may still queue their links before the crawl stops
        if self.crawl_count_reached() {
            if self.in_flight() == 0 {
                tracing::info!("Maximum crawl count of {} reached", self.visited());
                lifecycle.request_stop();
            }
            return Ok(());
        }

        loop {
            if self.crawl_count_reached() {
                return Ok(());
            }

            let Ok(permit) = self.inner.slots.clone().try_acquire_owned() else {
                return Ok(());
            };
            let Some(entry) = self.inner.queue.pop()? else {
                return Ok(());
            };

            if !self.inner.observer.before_download(&entry.step) {
                tracing::debug!("Skipped {}: vetoed before download", entry.step.url());
                continue;
            }

            self.start_download(entry, permit);
        }
    }

    fn crawl_count_reached(&self) -> bool {
        self.inner
            .settings
            .max_crawl_count
            .is_some_and(|limit| self.visited() >= limit)
    }

    fn start_download(&self, entry: QueueEntry, permit: OwnedSemaphorePermit) {
        self.inner.visited.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Downloading {} (depth {})", entry.step.url(), entry.step.depth());

        let observer = self.inner.observer.clone();
        let progress: ProgressCallback = Arc::new(move |p| observer.download_progress(p));
        let crawler = self.clone();
        let slot = WorkerSlot {
            crawler: self.clone(),
            permit: Some(permit),
        };

        spawn_download(
            self.inner.downloader.clone(),
            entry.step,
            entry.referrer,
            self.inner.settings.method,
            Some(progress),
            (entry.properties, slot),
            move |completion| async move { crawler.end_download(completion).await },
        );
    }

    /// Delivers a finished download, then frees its slot
    async fn end_download(&self, completion: DownloadCompletion<DownloadTicket>) {
        let DownloadCompletion {
            step,
            referrer,
            state: (properties, slot),
            result,
        } = completion;

        match result {
            Ok(bag) => {
                bag.merge_properties(properties);
                if self.inner.observer.after_download(&step, &bag) {
                    self.inner
                        .pipeline
                        .run(self, &bag, self.inner.observer.as_ref())
                        .await;
                }
            }
            Err(error) => {
                self.inner.download_errors.fetch_add(1, Ordering::SeqCst);
                self.inner
                    .observer
                    .download_exception(&step, referrer.as_ref(), &error);
            }
        }

        drop(slot);
    }

    /// Enters `Stopping` and lets the scheduler finish the crawl
    fn stop(&self) {
        self.lifecycle().request_stop();
        self.process_queue();
    }

    /// Records a storage failure as fatal and stops the crawl
    fn abort(&self, error: StorageError) -> RippleError {
        let message = error.to_string();
        {
            let mut lifecycle = self.lifecycle();
            lifecycle.record_fatal(error);
            lifecycle.request_stop();
        }
        self.process_queue();
        RippleError::Aborted(message)
    }

    /// Re-enters the scheduler once the crawl time limit has passed
    fn spawn_deadline(&self, limit: Duration) {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if let Some(inner) = inner.upgrade() {
                Crawler { inner }.process_queue();
            }
        });
    }

    async fn wait_until_stopped(&self) {
        loop {
            let stopped = self.inner.stopped.notified();
            if self.state() == CrawlState::Stopped {
                return;
            }
            stopped.await;
        }
    }

    fn finish_report(&self) -> crate::Result<CrawlSummary> {
        let registered = self.inner.history.registered_count().unwrap_or_else(|e| {
            tracing::warn!("Could not count registered URLs: {}", e);
            0
        });

        let (summary, fatal) = {
            let mut lifecycle = self.lifecycle();
            let summary = CrawlSummary {
                seed: self.seed().clone(),
                runtime: lifecycle.elapsed(),
                visited: self.visited(),
                registered,
                download_errors: self.download_errors(),
                cancelled: lifecycle.was_cancelled(),
            };
            (summary, lifecycle.take_fatal())
        };

        if summary.cancelled {
            self.inner.observer.cancelled();
        }
        self.inner.observer.crawl_finished(&summary);

        match fatal {
            Some(error) => Err(RippleError::Storage(error)),
            None => Ok(summary),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("seed", &self.inner.settings.seed.as_str())
            .field("state", &self.state())
            .field("visited", &self.visited())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

//! Crawl events and the end-of-crawl summary

use crate::download::{DownloadError, DownloadProgress};
use crate::model::{CrawlStep, PropertyBag};
use std::fmt;
use std::time::Duration;
use url::Url;

/// What a finished crawl did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub seed: Url,
    pub runtime: Duration,
    /// Downloads started
    pub visited: u64,
    /// Distinct URLs admitted to the history
    pub registered: u64,
    /// Downloads that ended without a response
    pub download_errors: u64,
    pub cancelled: bool,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} visited, {} registered, {} download errors in {:.1}s{}",
            self.seed,
            self.visited,
            self.registered,
            self.download_errors,
            self.runtime.as_secs_f64(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

/// Receives notifications as a crawl progresses
///
/// Every method has a default that does nothing (or allows the action), so
/// observers only implement what they care about. Methods are called from the
/// download tasks and must not block.
pub trait CrawlObserver: Send + Sync {
    /// Called after an entry is popped; returning false skips the download
    ///
    /// Runs while the scheduler lock is held, so it must not call back into
    /// the [`Crawler`](crate::crawler::Crawler) (not even `state` or `cancel`).
    fn before_download(&self, _step: &CrawlStep) -> bool {
        true
    }

    /// Called with each response; returning false skips the pipeline
    fn after_download(&self, _step: &CrawlStep, _bag: &PropertyBag) -> bool {
        true
    }

    fn download_progress(&self, _progress: &DownloadProgress) {}

    /// Called when a download ends without a response
    fn download_exception(
        &self,
        _step: &CrawlStep,
        _referrer: Option<&CrawlStep>,
        _error: &DownloadError,
    ) {
    }

    /// Called when a pipeline step fails or panics
    fn processor_exception(&self, _bag: &PropertyBag, _step_name: &str, _error: &anyhow::Error) {}

    /// Called once when a cancelled crawl has drained
    fn cancelled(&self) {}

    /// Called once when the crawl reaches its final state
    fn crawl_finished(&self, _summary: &CrawlSummary) {}
}

/// Observer that reports events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn after_download(&self, step: &CrawlStep, bag: &PropertyBag) -> bool {
        tracing::info!(
            "Downloaded {} -> {} in {:?}",
            step.url(),
            bag.status().as_u16(),
            bag.download_time()
        );
        true
    }

    fn download_progress(&self, progress: &DownloadProgress) {
        tracing::trace!(
            "{}: {} bytes received{}",
            progress.step.url(),
            progress.bytes_received,
            progress
                .percent_complete()
                .map(|percent| format!(" ({:.0}%)", percent))
                .unwrap_or_default()
        );
    }

    fn download_exception(&self, step: &CrawlStep, referrer: Option<&CrawlStep>, error: &DownloadError) {
        match referrer {
            Some(referrer) => tracing::warn!(
                "Download of {} (linked from {}) failed: {}",
                step.url(),
                referrer.url(),
                error
            ),
            None => tracing::warn!("Download of {} failed: {}", step.url(), error),
        }
    }

    fn processor_exception(&self, bag: &PropertyBag, step_name: &str, error: &anyhow::Error) {
        tracing::warn!(
            "Step {} failed on {}: {:#}",
            step_name,
            bag.step().url(),
            error
        );
    }

    fn cancelled(&self) {
        tracing::info!("Crawl cancelled");
    }

    fn crawl_finished(&self, summary: &CrawlSummary) {
        tracing::info!("Crawl finished: {}", summary);
    }
}

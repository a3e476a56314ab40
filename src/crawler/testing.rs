//! In-process doubles for driving crawls in tests

use crate::crawler::{CrawlObserver, CrawlSettings, CrawlSummary, Crawler, CrawlerServices};
use crate::download::{DownloadError, Downloader, RequestState, ResponseBody, RetryPolicy};
use crate::model::{CrawlStep, PropertyBag};
use crate::pipeline::PipelineStep;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakePage {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

/// Serves pages from a map keyed by URL; anything else is a 404
#[derive(Default)]
pub(crate) struct FakeDownloader {
    pages: HashMap<String, FakePage>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    requested: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDownloader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn html(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FakePage {
                status: StatusCode::OK,
                content_type: "text/html; charset=utf-8",
                body: body.to_string(),
            },
        );
        self
    }

    /// Every attempt for `url` fails with a transport-level error
    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs in the order their downloads were attempted
    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    async fn attempt(&self, request: &mut RequestState) -> Result<PropertyBag, DownloadError> {
        let url = request.step.url().to_string();
        self.requested.lock().unwrap().push(url.clone());

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&url) {
            return Err(DownloadError::Failed {
                url,
                message: "connection refused".to_string(),
            });
        }

        let (status, content_type, body) = match self.pages.get(&url) {
            Some(page) => (page.status, page.content_type, page.body.clone()),
            None => (StatusCode::NOT_FOUND, "text/plain", String::new()),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

        Ok(PropertyBag::new(
            request.step.clone(),
            request.step.url().clone(),
            status,
            ResponseBody::from_bytes(body.into_bytes()),
        )
        .with_referrer(request.referrer.clone())
        .with_headers(headers))
    }
}

/// Counts events and optionally vetoes one URL before download
#[derive(Default)]
pub(crate) struct RecordingObserver {
    veto: Option<String>,
    download_exceptions: AtomicUsize,
    processor_exceptions: AtomicUsize,
    cancelled: AtomicUsize,
    finished: AtomicUsize,
}

impl RecordingObserver {
    pub(crate) fn vetoing(url: &str) -> Self {
        Self {
            veto: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn download_exception_count(&self) -> usize {
        self.download_exceptions.load(Ordering::SeqCst)
    }

    pub(crate) fn processor_exception_count(&self) -> usize {
        self.processor_exceptions.load(Ordering::SeqCst)
    }

    pub(crate) fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl CrawlObserver for RecordingObserver {
    fn before_download(&self, step: &CrawlStep) -> bool {
        self.veto.as_deref() != Some(step.url().as_str())
    }

    fn download_exception(&self, _: &CrawlStep, _: Option<&CrawlStep>, _: &DownloadError) {
        self.download_exceptions.fetch_add(1, Ordering::SeqCst);
    }

    fn processor_exception(&self, _: &PropertyBag, _: &str, _: &anyhow::Error) {
        self.processor_exceptions.fetch_add(1, Ordering::SeqCst);
    }

    fn cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    fn crawl_finished(&self, _: &CrawlSummary) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// A crawler over in-memory storage with unfiltered rules
pub(crate) fn crawler_with(
    settings: CrawlSettings,
    downloader: Arc<FakeDownloader>,
    pipeline: Vec<Arc<dyn PipelineStep>>,
) -> Crawler {
    let services = CrawlerServices::in_memory(&settings.seed, downloader);
    Crawler::new(settings, services, pipeline)
}

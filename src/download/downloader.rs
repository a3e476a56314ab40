//! The downloader contract and its retry loop

use crate::download::{
    DownloadError, DownloadMethod, ProgressCallback, RequestState, RetryPolicy,
};
use crate::model::{CrawlStep, PropertyBag};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Fetches crawl steps
///
/// Implementors supply a single [`attempt`](Downloader::attempt); the provided
/// [`fetch`](Downloader::fetch) wraps it in the retry loop. HTTP error statuses
/// are successful attempts: they produce a [`PropertyBag`] like any other
/// response. Only failures to obtain a response at all are retried.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// How many times a failed download is retried
    fn retry_policy(&self) -> RetryPolicy;

    /// Makes one request, buffering the body into `request`
    async fn attempt(&self, request: &mut RequestState) -> Result<PropertyBag, DownloadError>;

    /// Downloads a step with retries and optional progress reporting
    ///
    /// # Returns
    ///
    /// * `Ok(PropertyBag)` - A response was received, whatever its status
    /// * `Err(DownloadError::RetriesExhausted)` - Every attempt in the budget
    ///   failed with a retryable error
    /// * `Err(DownloadError)` - An attempt failed with a terminal error
    async fn fetch(
        &self,
        step: &CrawlStep,
        referrer: Option<&CrawlStep>,
        method: DownloadMethod,
        progress: Option<ProgressCallback>,
    ) -> Result<PropertyBag, DownloadError> {
        let policy = self.retry_policy();
        let mut request = RequestState::new(
            step.clone(),
            referrer.cloned(),
            method,
            policy.budget(),
            progress,
        );
        let mut last_error = None;

        while request.begin_attempt() {
            match self.attempt(&mut request).await {
                Ok(bag) => return Ok(bag),
                Err(e) if e.is_retryable() => {
                    request.clean();
                    tracing::warn!(
                        "Attempt {} of {} for {} failed: {}",
                        request.attempts(),
                        policy.budget(),
                        step.url(),
                        e
                    );
                    last_error = Some(e);

                    if request.remaining() > 0 {
                        if let Some(wait) = policy.retry_wait {
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(DownloadError::RetriesExhausted {
            url: step.url().to_string(),
            attempts: request.attempts(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }

    /// Downloads a step without progress reporting
    async fn download(
        &self,
        step: &CrawlStep,
        referrer: Option<&CrawlStep>,
        method: DownloadMethod,
    ) -> Result<PropertyBag, DownloadError> {
        self.fetch(step, referrer, method, None).await
    }
}

/// Everything handed back when a spawned download finishes
#[derive(Debug)]
pub struct DownloadCompletion<T> {
    pub step: CrawlStep,
    pub referrer: Option<CrawlStep>,
    pub state: T,
    pub result: Result<PropertyBag, DownloadError>,
}

/// Starts a download in the background and calls `on_complete` when it ends
///
/// `state` is carried through untouched and returned in the completion, which
/// lets the caller keep per-download resources alive until the callback has
/// finished.
///
/// # Returns
///
/// A handle to the spawned task
pub fn spawn_download<T, F, Fut>(
    downloader: Arc<dyn Downloader>,
    step: CrawlStep,
    referrer: Option<CrawlStep>,
    method: DownloadMethod,
    on_progress: Option<ProgressCallback>,
    state: T,
    on_complete: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnOnce(DownloadCompletion<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let result = downloader
            .fetch(&step, referrer.as_ref(), method, on_progress)
            .await;
        on_complete(DownloadCompletion {
            step,
            referrer,
            state,
            result,
        })
        .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::ResponseBody;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    /// Fails the first `failures` attempts, then answers 200
    struct FlakyDownloader {
        failures: u32,
        calls: AtomicU32,
        policy: RetryPolicy,
    }

    #[async_trait]
    impl Downloader for FlakyDownloader {
        fn retry_policy(&self) -> RetryPolicy {
            self.policy
        }

        async fn attempt(&self, request: &mut RequestState) -> Result<PropertyBag, DownloadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(DownloadError::Failed {
                    url: request.step.url().to_string(),
                    message: "connection reset".to_string(),
                });
            }
            Ok(PropertyBag::new(
                request.step.clone(),
                request.step.url().clone(),
                StatusCode::OK,
                ResponseBody::empty(),
            ))
        }
    }

    fn step() -> CrawlStep {
        CrawlStep::new(Url::parse("http://a.test/").unwrap(), 0)
    }

    fn flaky(failures: u32, retry_count: u32) -> FlakyDownloader {
        FlakyDownloader {
            failures,
            calls: AtomicU32::new(0),
            policy: RetryPolicy::new(retry_count, Some(std::time::Duration::from_millis(1))),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_after_exact_attempts() {
        let downloader = flaky(u32::MAX, 2);
        let result = downloader.download(&step(), None, DownloadMethod::Get).await;

        match result {
            Err(DownloadError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retries_means_single_attempt() {
        let downloader = flaky(u32::MAX, 0);
        assert!(downloader
            .download(&step(), None, DownloadMethod::Get)
            .await
            .is_err());
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let downloader = flaky(1, 1);
        let bag = downloader
            .download(&step(), None, DownloadMethod::Get)
            .await
            .unwrap();
        assert_eq!(bag.status(), StatusCode::OK);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_spawn_download_returns_state() {
        let downloader: Arc<dyn Downloader> = Arc::new(flaky(0, 0));
        let (tx, rx) = tokio::sync::oneshot::channel();

        spawn_download(
            downloader,
            step(),
            None,
            DownloadMethod::Get,
            None,
            42u32,
            move |completion| async move {
                let _ = tx.send((completion.state, completion.result.is_ok()));
            },
        )
        .await
        .unwrap();

        assert_eq!(rx.await.unwrap(), (42, true));
    }
}

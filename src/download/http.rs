//! HTTP downloader built on reqwest
//!
//! This module handles the requests the crawler makes, including:
//! - Building the HTTP client with the configured user agent and cookie jar
//! - Connection and per-chunk read timeouts
//! - Streaming bodies into a spill buffer with progress reporting
//! - Enforcing the maximum content size
//! - Classifying failures as retryable or terminal

use crate::config::DownloaderConfig;
use crate::download::{
    DownloadError, Downloader, RequestState, ResponseBody, RetryPolicy, SpillBuffer,
};
use crate::model::PropertyBag;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client from the downloader configuration
///
/// # Arguments
///
/// * `config` - The downloader configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &DownloaderConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .cookie_store(config.use_cookies)
        .gzip(true)
        .brotli(true);

    if let Some(timeout) = config.connect_timeout() {
        builder = builder.connect_timeout(timeout);
    }

    builder.build()
}

/// Downloads steps over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    config: DownloaderConfig,
}

impl HttpDownloader {
    /// Creates a downloader with its own client
    pub fn new(config: DownloaderConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Sends the request, bounded by the connect timeout when one is set
    async fn send(&self, request: &RequestState) -> Result<Response, DownloadError> {
        let url = request.step.url();
        let pending = self
            .client
            .request(request.method.as_reqwest(), url.clone())
            .header(reqwest::header::ACCEPT, "*/*")
            .send();

        let sent = match self.config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| DownloadError::Timeout {
                    url: url.to_string(),
                    elapsed: limit,
                })?,
            None => pending.await,
        };

        sent.map_err(|source| classify(url.as_str(), source, request.elapsed()))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn retry_policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    async fn attempt(&self, request: &mut RequestState) -> Result<PropertyBag, DownloadError> {
        let url = request.step.url().to_string();
        let mut response = self.send(request).await?;

        let declared_length = response.content_length();
        if let (Some(limit), Some(length)) = (self.config.max_content_size, declared_length) {
            if length > limit {
                return Err(DownloadError::ContentTooLarge { url, limit });
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let response_url = response.url().clone();
        let protocol_version = format!("{:?}", response.version());

        let buffer = SpillBuffer::new(
            declared_length,
            self.config.max_download_size_in_ram,
            self.config.download_buffer_size,
        )
        .map_err(|source| DownloadError::Buffer {
            url: url.clone(),
            source,
        })?;
        request.attach_buffer(buffer);

        loop {
            let read = match self.config.read_timeout() {
                Some(limit) => tokio::time::timeout(limit, response.chunk())
                    .await
                    .map_err(|_| DownloadError::Timeout {
                        url: url.clone(),
                        elapsed: limit,
                    })?,
                None => response.chunk().await,
            };
            let Some(chunk) = read.map_err(|source| DownloadError::Transport {
                url: url.clone(),
                source,
            })?
            else {
                break;
            };

            let received = request
                .write_chunk(chunk.as_ref(), declared_length)
                .map_err(|source| DownloadError::Buffer {
                    url: url.clone(),
                    source,
                })?;

            if let Some(limit) = self.config.max_content_size {
                if received > limit {
                    return Err(DownloadError::ContentTooLarge { url, limit });
                }
            }
        }

        let body = request
            .take_buffer()
            .map(SpillBuffer::seal)
            .transpose()
            .map_err(|source| DownloadError::Buffer {
                url: url.clone(),
                source,
            })?
            .unwrap_or_else(ResponseBody::empty);

        tracing::debug!(
            "{} {} -> {} ({} bytes{})",
            request.method,
            url,
            status.as_u16(),
            body.len(),
            if body.is_on_disk() { ", on disk" } else { "" }
        );

        Ok(PropertyBag::new(request.step.clone(), response_url, status, body)
            .with_referrer(request.referrer.clone())
            .with_method(request.method)
            .with_headers(headers)
            .with_protocol_version(protocol_version)
            .with_timing(request.started_at(), request.elapsed()))
    }
}

/// Maps a reqwest failure onto a download error
fn classify(url: &str, source: reqwest::Error, elapsed: Duration) -> DownloadError {
    if source.is_timeout() {
        DownloadError::Timeout {
            url: url.to_string(),
            elapsed,
        }
    } else {
        DownloadError::Transport {
            url: url.to_string(),
            source,
        }
    }
}

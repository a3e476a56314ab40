use crate::download::RetryPolicy;
use crate::url::UrlSensitivity;
use crate::UrlResult;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for Ripple-Crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawl scope and limits
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    pub seed: Url,

    /// Maximum link distance from the seed; 0 means unlimited
    #[serde(rename = "max-depth", default)]
    pub max_depth: u32,

    /// Maximum number of concurrent downloads
    #[serde(rename = "max-threads", default = "default_max_threads")]
    pub max_threads: usize,

    /// Wall-clock limit for the whole crawl
    #[serde(rename = "max-crawl-time-secs", default)]
    pub max_crawl_time_secs: Option<u64>,

    /// Maximum number of downloads started
    #[serde(rename = "max-crawl-count", default)]
    pub max_crawl_count: Option<u64>,

    /// URLs longer than this are rejected (ignored when 10 or less)
    #[serde(rename = "max-url-size", default)]
    pub max_url_size: Option<usize>,

    #[serde(rename = "adhere-to-robots", default = "default_true")]
    pub adhere_to_robots: bool,

    /// Regexes; a match admits the URL even when it is external
    #[serde(default)]
    pub include: Vec<String>,

    /// Regexes; a match rejects the URL
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Host patterns (e.g., "*.example.com") admitted like `include`
    #[serde(rename = "include-hosts", default)]
    pub include_hosts: Vec<String>,

    /// Host patterns rejected like `exclude`
    #[serde(rename = "exclude-hosts", default)]
    pub exclude_hosts: Vec<String>,

    /// URL components that take part in the dedup key
    #[serde(rename = "url-sensitivity", default = "default_url_sensitivity")]
    pub url_sensitivity: Vec<String>,

    /// Keep the persisted queue and history of a previous run
    #[serde(default)]
    pub resume: bool,
}

impl CrawlerConfig {
    /// A configuration for `seed` with every option at its default
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            max_depth: 0,
            max_threads: default_max_threads(),
            max_crawl_time_secs: None,
            max_crawl_count: None,
            max_url_size: None,
            adhere_to_robots: true,
            include: Vec::new(),
            exclude: Vec::new(),
            include_hosts: Vec::new(),
            exclude_hosts: Vec::new(),
            url_sensitivity: default_url_sensitivity(),
            resume: false,
        }
    }

    pub fn max_crawl_time(&self) -> Option<Duration> {
        self.max_crawl_time_secs.map(Duration::from_secs)
    }

    pub fn sensitivity(&self) -> UrlResult<UrlSensitivity> {
        UrlSensitivity::from_components(&self.url_sensitivity)
    }
}

/// HTTP downloader configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DownloaderConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "use-cookies", default)]
    pub use_cookies: bool,

    #[serde(rename = "connect-timeout-ms", default)]
    pub connect_timeout_ms: Option<u64>,

    /// Longest wait for the next chunk of a response body
    #[serde(rename = "read-timeout-ms", default)]
    pub read_timeout_ms: Option<u64>,

    /// Responses larger than this many bytes are abandoned
    #[serde(rename = "max-content-size", default)]
    pub max_content_size: Option<u64>,

    /// Bodies declared larger than this many bytes are buffered on disk
    #[serde(
        rename = "max-download-size-in-ram",
        default = "default_max_download_size_in_ram"
    )]
    pub max_download_size_in_ram: u64,

    #[serde(
        rename = "download-buffer-size",
        default = "default_download_buffer_size"
    )]
    pub download_buffer_size: usize,

    /// Retries after the first failed attempt
    #[serde(rename = "retry-count", default)]
    pub retry_count: u32,

    #[serde(rename = "retry-wait-ms", default)]
    pub retry_wait_ms: Option<u64>,
}

impl DownloaderConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn retry_wait(&self) -> Option<Duration> {
        self.retry_wait_ms.map(Duration::from_millis)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_wait())
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            use_cookies: false,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            max_content_size: None,
            max_download_size_in_ram: default_max_download_size_in_ram(),
            download_buffer_size: default_download_buffer_size(),
            retry_count: 0,
            retry_wait_ms: None,
        }
    }
}

/// Where the queue and history are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Sqlite,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory (file backend) or database file (sqlite backend)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_max_threads() -> usize {
    1
}

fn default_url_sensitivity() -> Vec<String> {
    ["scheme", "host", "port", "path", "query"]
        .iter()
        .map(|component| component.to_string())
        .collect()
}

fn default_user_agent() -> String {
    format!("ripple-crawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_download_size_in_ram() -> u64 {
    1024 * 1024
}

fn default_download_buffer_size() -> usize {
    50 * 1024
}

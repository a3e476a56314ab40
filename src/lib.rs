//! Ripple-Crawl: a polite, resumable web crawler engine
//!
//! This crate walks a website starting from a seed URL. It honors robots.txt,
//! filters and deduplicates discovered URLs, downloads pages concurrently under
//! a bounded worker count, and hands each response to a user-supplied pipeline
//! of processing steps. The work queue and the dedup history can be persisted so
//! that an interrupted crawl resumes where it left off.

pub mod config;
pub mod crawler;
pub mod download;
pub mod model;
pub mod pipeline;
pub mod robots;
pub mod rules;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Crawl operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Download error: {0}")]
    Download(#[from] download::DownloadError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Crawl has already been cancelled")]
    AlreadyCancelled,

    #[error("Crawl aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Unknown URL component: {0}")]
    UnknownComponent(String),
}

/// Result type alias for Ripple-Crawl operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlObserver, CrawlSettings, CrawlState, CrawlSummary, Crawler, CrawlerServices};
pub use download::{Downloader, HttpDownloader};
pub use model::{CrawlStep, PropertyBag, QueueEntry};
pub use pipeline::PipelineStep;
pub use crate::url::{url_key, UrlSensitivity};

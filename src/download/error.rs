use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while downloading a step
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out after {elapsed:?}")]
    Timeout { url: String, elapsed: Duration },

    #[error("Failed to buffer response from {url}: {source}")]
    Buffer {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Response from {url} exceeds the maximum content size of {limit} bytes")]
    ContentTooLarge { url: String, limit: u64 },

    #[error("Transport failure for {url}: {message}")]
    Failed { url: String, message: String },

    #[error("Download of {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl DownloadError {
    /// Returns true if another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Buffer { .. } | Self::Failed { .. }
        )
    }

    /// The URL the failed request was for
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url, .. }
            | Self::Buffer { url, .. }
            | Self::ContentTooLarge { url, .. }
            | Self::Failed { url, .. }
            | Self::RetriesExhausted { url, .. } => url,
        }
    }
}

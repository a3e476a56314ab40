//! Download module for Ripple-Crawl
//!
//! This module contains the downloader contract and its HTTP implementation:
//! - `buffer`: spill-to-disk response buffering
//! - `request`: per-download state, retry policy and progress reporting
//! - `downloader`: the [`Downloader`] trait, its retry loop and [`spawn_download`]
//! - `http`: the reqwest-backed [`HttpDownloader`]

mod buffer;
mod downloader;
mod error;
mod http;
mod request;

pub use buffer::{ResponseBody, SpillBuffer};
pub use downloader::{spawn_download, DownloadCompletion, Downloader};
pub use error::DownloadError;
pub use http::{build_http_client, HttpDownloader};
pub use request::{DownloadMethod, DownloadProgress, ProgressCallback, RequestState, RetryPolicy};

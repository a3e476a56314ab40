//! Per-download request state and progress reporting

use crate::download::SpillBuffer;
use crate::model::CrawlStep;
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// HTTP method used for a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DownloadMethod {
    #[default]
    Get,
    Head,
    Post,
}

impl DownloadMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Head => reqwest::Method::HEAD,
            Self::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for DownloadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
        };
        f.write_str(name)
    }
}

/// A snapshot of how far a download has come
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub step: CrawlStep,
    pub bytes_received: u64,
    pub total_bytes: Option<u64>,
    pub elapsed: Duration,
}

impl DownloadProgress {
    /// Percentage of the declared length received, if the length is known
    pub fn percent_complete(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some(self.bytes_received as f64 * 100.0 / total as f64),
            None => None,
        }
    }
}

/// Callback invoked as response bytes arrive
///
/// Delivery is best effort; callers must not rely on seeing every chunk.
pub type ProgressCallback = Arc<dyn Fn(&DownloadProgress) + Send + Sync>;

/// Number of attempts a download may make and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub retry_wait: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, retry_wait: Option<Duration>) -> Self {
        Self {
            retry_count,
            retry_wait,
        }
    }

    /// Total attempts allowed: the first try plus every retry
    pub fn budget(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

/// State of one in-flight download
///
/// Lives for the whole download including retries. The retry budget is
/// consumed one unit per attempt; the response buffer is owned by the current
/// attempt and discarded before the next one starts.
pub struct RequestState {
    pub step: CrawlStep,
    pub referrer: Option<CrawlStep>,
    pub method: DownloadMethod,
    budget: u32,
    attempts: u32,
    started: Instant,
    started_at: DateTime<Utc>,
    buffer: Option<SpillBuffer>,
    progress: Option<ProgressCallback>,
}

impl RequestState {
    pub fn new(
        step: CrawlStep,
        referrer: Option<CrawlStep>,
        method: DownloadMethod,
        budget: u32,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            step,
            referrer,
            method,
            budget,
            attempts: 0,
            started: Instant::now(),
            started_at: Utc::now(),
            buffer: None,
            progress,
        }
    }

    /// Consumes one unit of retry budget
    ///
    /// # Returns
    ///
    /// * `true` - An attempt may be made
    /// * `false` - The budget is exhausted
    pub fn begin_attempt(&mut self) -> bool {
        if self.budget == 0 {
            return false;
        }
        self.budget -= 1;
        self.attempts += 1;
        self.started = Instant::now();
        self.started_at = Utc::now();
        self.buffer = None;
        true
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts still allowed
    pub fn remaining(&self) -> u32 {
        self.budget
    }

    /// Wall-clock start of the current attempt
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the current attempt started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Installs the buffer the current attempt streams into
    pub fn attach_buffer(&mut self, buffer: SpillBuffer) {
        self.buffer = Some(buffer);
    }

    /// Writes a chunk into the attached buffer and reports progress
    ///
    /// # Returns
    ///
    /// Total bytes received by the current attempt
    pub fn write_chunk(&mut self, chunk: &[u8], total_bytes: Option<u64>) -> io::Result<u64> {
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no response buffer attached"))?;
        buffer.write_chunk(chunk)?;
        let received = buffer.bytes_written();

        if let Some(progress) = &self.progress {
            progress(&DownloadProgress {
                step: self.step.clone(),
                bytes_received: received,
                total_bytes,
                elapsed: self.started.elapsed(),
            });
        }

        Ok(received)
    }

    /// Hands the buffer over for sealing, leaving the state without one
    pub fn take_buffer(&mut self) -> Option<SpillBuffer> {
        self.buffer.take()
    }

    /// Drops any partial response from a failed attempt
    pub fn clean(&mut self) {
        self.buffer = None;
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("url", &self.step.url().as_str())
            .field("method", &self.method)
            .field("attempts", &self.attempts)
            .field("remaining", &self.budget)
            .field("buffer", &self.buffer)
            .finish()
    }
}

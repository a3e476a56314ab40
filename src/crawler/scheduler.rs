//! Crawl lifecycle state
//!
//! `Idle -> Crawling -> {Stopping, Cancelling} -> Stopped`. The transitions
//! live here; the scheduling decisions that drive them live in the
//! coordinator, which holds this state under its scheduler lock.

use crate::storage::StorageError;
use crate::RippleError;
use std::fmt;
use std::time::{Duration, Instant};

/// Where a crawl is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Created, not yet started
    Idle,
    /// Scheduling downloads
    Crawling,
    /// A limit was reached; draining in-flight work
    Stopping,
    /// Cancellation was requested; draining in-flight work
    Cancelling,
    /// Finished; the crawler cannot be reused
    Stopped,
}

impl CrawlState {
    /// Returns true while in-flight work drains and nothing new starts
    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Stopping | Self::Cancelling)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Crawling => "crawling",
            Self::Stopping => "stopping",
            Self::Cancelling => "cancelling",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Mutable lifecycle data guarded by the scheduler lock
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: CrawlState,
    started: Option<Instant>,
    runtime: Option<Duration>,
    cancelled: bool,
    fatal: Option<StorageError>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: CrawlState::Idle,
            started: None,
            runtime: None,
            cancelled: false,
            fatal: None,
        }
    }

    pub(crate) fn state(&self) -> CrawlState {
        self.state
    }

    /// `Idle -> Crawling`; a crawler runs once
    pub(crate) fn begin(&mut self) -> Result<(), RippleError> {
        if self.state != CrawlState::Idle {
            return Err(RippleError::InvalidOperation(format!(
                "crawl cannot start while {}; a crawler runs only once",
                self.state
            )));
        }
        self.state = CrawlState::Crawling;
        self.started = Some(Instant::now());
        Ok(())
    }

    /// `Crawling -> Stopping`; other states are left alone
    pub(crate) fn request_stop(&mut self) -> bool {
        if self.state == CrawlState::Crawling {
            self.state = CrawlState::Stopping;
            return true;
        }
        false
    }

    /// `Crawling | Stopping -> Cancelling`
    pub(crate) fn request_cancel(&mut self) -> Result<(), RippleError> {
        if self.cancelled {
            return Err(RippleError::AlreadyCancelled);
        }
        match self.state {
            CrawlState::Crawling | CrawlState::Stopping => {
                self.state = CrawlState::Cancelling;
                self.cancelled = true;
                Ok(())
            }
            state => Err(RippleError::InvalidOperation(format!(
                "only a running crawl can be cancelled, crawl is {}",
                state
            ))),
        }
    }

    /// Moves to `Stopped`
    ///
    /// # Returns
    ///
    /// `true` if this call made the transition
    pub(crate) fn finish(&mut self) -> bool {
        if matches!(self.state, CrawlState::Idle | CrawlState::Stopped) {
            return false;
        }
        self.state = CrawlState::Stopped;
        self.runtime = Some(self.elapsed());
        true
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.runtime
            .or_else(|| self.started.map(|started| started.elapsed()))
            .unwrap_or_default()
    }

    pub(crate) fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Keeps the first storage failure; later ones are only logged
    pub(crate) fn record_fatal(&mut self, error: StorageError) {
        if self.fatal.is_none() {
            tracing::error!("Storage failure, stopping crawl: {}", error);
            self.fatal = Some(error);
        } else {
            tracing::error!("Further storage failure: {}", error);
        }
    }

    pub(crate) fn take_fatal(&mut self) -> Option<StorageError> {
        self.fatal.take()
    }
}

//! Crawler module for crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - The crawl lifecycle (`Idle -> Crawling -> Stopping/Cancelling -> Stopped`)
//! - Scheduling downloads under a bounded number of worker slots
//! - Crawl events and the end-of-crawl summary
//! - Assembling the crawler's collaborators from configuration

mod coordinator;
mod events;
mod scheduler;
mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{CrawlSettings, Crawler};
pub use events::{CrawlObserver, CrawlSummary, TracingObserver};
pub use scheduler::CrawlState;
pub use services::CrawlerServices;

use crate::config::Config;
use crate::pipeline::PipelineStep;
use std::sync::Arc;

/// Runs a complete crawl described by a configuration
///
/// This is the main entry point for a configured crawl. It will:
/// 1. Open the queue and history for the seed's crawl identity
/// 2. Build the HTTP downloader and admission rules
/// 3. Crawl from the seed, or resume the persisted queue
/// 4. Return the summary once the crawl stops
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `pipeline` - Steps run over every downloaded page
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(RippleError)` - Crawl could not start or storage failed
pub async fn crawl(
    config: &Config,
    pipeline: Vec<Arc<dyn PipelineStep>>,
) -> crate::Result<CrawlSummary> {
    Crawler::from_config(config, pipeline)?.crawl().await
}

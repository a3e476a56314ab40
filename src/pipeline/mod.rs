//! Processing pipeline for downloaded pages
//!
//! - [`PipelineStep`]: the contract every stage implements
//! - [`FnStep`]: a closure-backed stage
//! - [`LinkExtractor`]: follows links found in HTML pages
//! - [`PipelineRunner`]: runs the stages in order with failure isolation

mod link_extractor;
mod runner;
mod step;

pub use link_extractor::{
    parse_html, DiscoveredLink, LinkExtractor, ParsedPage, ORIGINAL_REFERRER_URL, ORIGINAL_URL,
};
pub use runner::{PipelineRunner, StepOutcome};
pub use step::{FnStep, PipelineStep};

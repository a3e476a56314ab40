//! Admission rules for Ripple-Crawl
//!
//! [`AdmissionRules`] is the contract the crawler consults before a URL is
//! queued. [`CrawlerRules`] is the standard policy, built from include and
//! exclude [`UrlFilter`]s, the seed's site and robots.txt.

mod filter;
mod policy;

pub use filter::{FnFilter, HostFilter, RegexFilter, UrlFilter};
pub use policy::{AdmissionRules, CrawlerRules};

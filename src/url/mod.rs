//! URL handling module for Ripple-Crawl
//!
//! This module provides dedup keys, link resolution, host extraction and
//! wildcard host matching.

mod domain;
mod key;
mod matcher;
mod resolve;

pub use domain::{extract_domain, same_host};
pub use key::{url_key, UrlSensitivity, URL_COMPONENTS};
pub use matcher::matches_wildcard;
pub use resolve::{is_crawlable_scheme, parse_seed, resolve_link};

//! URL filters used by the include and exclude lists

use crate::model::CrawlStep;
use crate::url::{extract_domain, matches_wildcard};
use regex::Regex;
use std::fmt;
use url::Url;

/// A predicate over a candidate URL and the step that linked to it
pub trait UrlFilter: Send + Sync {
    fn matches(&self, url: &Url, referrer: Option<&CrawlStep>) -> bool;
}

/// Matches when a regular expression finds a match in the full URL text
#[derive(Debug, Clone)]
pub struct RegexFilter {
    regex: Regex,
}

impl RegexFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl UrlFilter for RegexFilter {
    fn matches(&self, url: &Url, _referrer: Option<&CrawlStep>) -> bool {
        self.regex.is_match(url.as_str())
    }
}

/// Matches URLs whose host fits a wildcard pattern such as `*.example.com`
#[derive(Debug, Clone)]
pub struct HostFilter {
    pattern: String,
}

impl HostFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl UrlFilter for HostFilter {
    fn matches(&self, url: &Url, _referrer: Option<&CrawlStep>) -> bool {
        extract_domain(url).is_some_and(|host| matches_wildcard(&self.pattern, &host))
    }
}

/// Matches by calling a closure
pub struct FnFilter<F> {
    predicate: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&Url, Option<&CrawlStep>) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> UrlFilter for FnFilter<F>
where
    F: Fn(&Url, Option<&CrawlStep>) -> bool + Send + Sync,
{
    fn matches(&self, url: &Url, referrer: Option<&CrawlStep>) -> bool {
        (self.predicate)(url, referrer)
    }
}

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilter")
    }
}

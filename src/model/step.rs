use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// A single unit of crawl work: a URL at a given distance from the seed
///
/// Equality, hashing and ordering consider only the URL, so two steps for the
/// same address at different depths compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStep {
    url: Url,
    depth: u32,
    #[serde(rename = "is-allowed")]
    is_allowed: bool,
    #[serde(rename = "is-external")]
    is_external: bool,
}

impl CrawlStep {
    /// Creates an allowed, internal step
    pub fn new(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            is_allowed: true,
            is_external: false,
        }
    }

    /// Creates a step with explicit admission flags
    pub fn with_flags(url: Url, depth: u32, is_allowed: bool, is_external: bool) -> Self {
        Self {
            url,
            depth,
            is_allowed,
            is_external,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_allowed(&self) -> bool {
        self.is_allowed
    }

    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

impl PartialEq for CrawlStep {
    fn eq(&self, other: &Self) -> bool {
        self.url.as_str() == other.url.as_str()
    }
}

impl Eq for CrawlStep {}

impl Hash for CrawlStep {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.as_str().hash(state);
    }
}

impl PartialOrd for CrawlStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CrawlStep {
    fn cmp(&self, other: &Self) -> Ordering {
        self.url.as_str().cmp(other.url.as_str())
    }
}

impl fmt::Display for CrawlStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (depth {})", self.url, self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn step(url: &str, depth: u32) -> CrawlStep {
        CrawlStep::new(Url::parse(url).unwrap(), depth)
    }

    #[test]
    fn test_equality_ignores_depth() {
        assert_eq!(step("http://a.test/x", 0), step("http://a.test/x", 3));
        assert_ne!(step("http://a.test/x", 0), step("http://a.test/y", 0));
    }

    #[test]
    fn test_hash_follows_url() {
        let mut set = HashSet::new();
        set.insert(step("http://a.test/", 0));
        set.insert(step("http://a.test/", 1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_by_url_text() {
        let mut steps = vec![step("http://b.test/", 0), step("http://a.test/", 2)];
        steps.sort();
        assert_eq!(steps[0].url().as_str(), "http://a.test/");
    }

    #[test]
    fn test_serde_keeps_flags() {
        let original = CrawlStep::with_flags(Url::parse("http://a.test/").unwrap(), 2, true, true);
        let json = serde_json::to_string(&original).unwrap();
        let decoded: CrawlStep = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.depth(), 2);
        assert!(decoded.is_external());
        assert!(decoded.is_allowed());
    }
}

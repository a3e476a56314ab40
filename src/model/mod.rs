//! Core data carried through a crawl
//!
//! - [`CrawlStep`]: a URL at a depth, with admission flags
//! - [`QueueEntry`]: a step waiting in the work queue, with its referrer and properties
//! - [`PropertyBag`]: a completed download as seen by pipeline steps

mod entry;
mod property_bag;
mod step;

pub use entry::{Properties, QueueEntry};
pub use property_bag::PropertyBag;
pub use step::CrawlStep;

use sha2::{Digest, Sha256};
use url::Url;

/// Derives the stable identity of a crawl from its seed URL
///
/// Persistent storage is namespaced by this value so that a later run with the
/// same seed finds its queue and history again.
///
/// # Returns
///
/// Hex-encoded SHA-256 of the seed URL text
pub fn crawl_id(seed: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_id_is_stable() {
        let seed = Url::parse("http://a.test/").unwrap();
        assert_eq!(crawl_id(&seed), crawl_id(&seed.clone()));
        assert_eq!(crawl_id(&seed).len(), 64);
    }

    #[test]
    fn test_crawl_id_differs_per_seed() {
        let a = Url::parse("http://a.test/").unwrap();
        let b = Url::parse("http://b.test/").unwrap();
        assert_ne!(crawl_id(&a), crawl_id(&b));
    }
}

use crate::model::CrawlStep;
use serde::{Deserialize, Serialize};

/// Arbitrary named values carried alongside a queued step
///
/// Insertion order is preserved so that persisted entries read back the same.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Persistable record of admitted work waiting to be downloaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub step: CrawlStep,
    #[serde(default)]
    pub referrer: Option<CrawlStep>,
    #[serde(default)]
    pub properties: Properties,
}

impl QueueEntry {
    pub fn new(step: CrawlStep, referrer: Option<CrawlStep>) -> Self {
        Self {
            step,
            referrer,
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

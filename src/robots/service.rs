//! Fetch-once robots.txt lookup for the seed's site

use crate::download::{DownloadMethod, Downloader};
use crate::model::CrawlStep;
use crate::robots::RobotRules;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Answers robots.txt questions for one crawl
///
/// The file is downloaded on first use and the result is kept for the life of
/// the service. Any failure to fetch it, and any non-200 response, is treated
/// as "no restrictions".
pub struct RobotService {
    robots_url: Url,
    user_agent: String,
    downloader: Arc<dyn Downloader>,
    rules: OnceCell<RobotRules>,
}

impl RobotService {
    /// Creates a service for the site hosting `seed`
    pub fn new(seed: &Url, user_agent: impl Into<String>, downloader: Arc<dyn Downloader>) -> Self {
        let mut robots_url = seed.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        Self {
            robots_url,
            user_agent: user_agent.into(),
            downloader,
            rules: OnceCell::new(),
        }
    }

    pub fn robots_url(&self) -> &Url {
        &self.robots_url
    }

    /// Returns true if robots.txt permits fetching `url`
    pub async fn is_allowed(&self, url: &Url) -> bool {
        self.rules().await.is_allowed(url.path())
    }

    /// Returns the rules, fetching robots.txt on first call
    pub async fn rules(&self) -> &RobotRules {
        self.rules.get_or_init(|| self.load()).await
    }

    async fn load(&self) -> RobotRules {
        let step = CrawlStep::new(self.robots_url.clone(), 0);
        let bag = match self.downloader.download(&step, None, DownloadMethod::Get).await {
            Ok(bag) => bag,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", self.robots_url, e);
                return RobotRules::allow_all();
            }
        };

        if bag.status() != reqwest::StatusCode::OK {
            tracing::debug!(
                "No robots.txt at {} (HTTP {})",
                self.robots_url,
                bag.status().as_u16()
            );
            return RobotRules::allow_all();
        }

        match bag.body().read_to_string_lossy() {
            Ok(content) => {
                let rules = RobotRules::parse(&content, &self.user_agent);
                tracing::debug!(
                    "Loaded {} with {} disallowed prefixes",
                    self.robots_url,
                    rules.disallowed().len()
                );
                rules
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.robots_url, e);
                RobotRules::allow_all()
            }
        }
    }
}

impl std::fmt::Debug for RobotService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotService")
            .field("robots_url", &self.robots_url.as_str())
            .field("user_agent", &self.user_agent)
            .field("loaded", &self.rules.initialized())
            .finish()
    }
}

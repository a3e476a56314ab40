//! The admission policy applied to every discovered URL

use crate::config::CrawlerConfig;
use crate::download::Downloader;
use crate::model::CrawlStep;
use crate::robots::RobotService;
use crate::rules::{HostFilter, RegexFilter, UrlFilter};
use crate::url::same_host;
use crate::{ConfigError, ConfigResult};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// URL lengths at or below this are never treated as a ceiling
const MIN_URL_SIZE_LIMIT: usize = 10;

/// Decides whether a discovered URL may join the crawl
#[async_trait]
pub trait AdmissionRules: Send + Sync {
    /// Returns true if the URL may be crawled; may perform I/O
    async fn is_allowed_url(&self, url: &Url, referrer: Option<&CrawlStep>) -> bool;

    /// Returns true if the URL is hosted somewhere other than the seed
    fn is_external_url(&self, url: &Url) -> bool;
}

/// The standard admission policy
///
/// Checks run in this order and the first one that decides wins:
/// 1. URL longer than the configured maximum: rejected
/// 2. Matches an include filter: allowed
/// 3. Matches an exclude filter: rejected
/// 4. Hosted off the seed's site: rejected
/// 5. Otherwise allowed, subject to robots.txt when a robot service is set
pub struct CrawlerRules {
    seed: Url,
    max_url_size: Option<usize>,
    include: Vec<Box<dyn UrlFilter>>,
    exclude: Vec<Box<dyn UrlFilter>>,
    robots: Option<RobotService>,
}

impl CrawlerRules {
    /// Creates rules with no filters, no size limit and no robots checks
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            max_url_size: None,
            include: Vec::new(),
            exclude: Vec::new(),
            robots: None,
        }
    }

    /// Builds the rules described by the crawler configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler section of the configuration
    /// * `user_agent` - Agent string matched against robots.txt groups
    /// * `downloader` - Used to fetch robots.txt when it is honored
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlerRules)` - The rules
    /// * `Err(ConfigError::InvalidPattern)` - A filter regex does not compile
    pub fn from_config(
        config: &CrawlerConfig,
        user_agent: &str,
        downloader: Arc<dyn Downloader>,
    ) -> ConfigResult<Self> {
        let compile = |pattern: &String| {
            RegexFilter::new(pattern)
                .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", pattern, e)))
        };

        let mut rules = Self::new(config.seed.clone());
        rules.max_url_size = config.max_url_size;

        for pattern in &config.include {
            rules = rules.include(compile(pattern)?);
        }
        for pattern in &config.include_hosts {
            rules = rules.include(HostFilter::new(pattern.as_str()));
        }
        for pattern in &config.exclude {
            rules = rules.exclude(compile(pattern)?);
        }
        for pattern in &config.exclude_hosts {
            rules = rules.exclude(HostFilter::new(pattern.as_str()));
        }

        if config.adhere_to_robots {
            rules = rules.with_robots(RobotService::new(&config.seed, user_agent, downloader));
        }

        Ok(rules)
    }

    pub fn include(mut self, filter: impl UrlFilter + 'static) -> Self {
        self.include.push(Box::new(filter));
        self
    }

    pub fn exclude(mut self, filter: impl UrlFilter + 'static) -> Self {
        self.exclude.push(Box::new(filter));
        self
    }

    pub fn max_url_size(mut self, size: usize) -> Self {
        self.max_url_size = Some(size);
        self
    }

    pub fn with_robots(mut self, robots: RobotService) -> Self {
        self.robots = Some(robots);
        self
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }
}

#[async_trait]
impl AdmissionRules for CrawlerRules {
    async fn is_allowed_url(&self, url: &Url, referrer: Option<&CrawlStep>) -> bool {
        if let Some(limit) = self.max_url_size.filter(|limit| *limit > MIN_URL_SIZE_LIMIT) {
            if url.as_str().len() > limit {
                tracing::trace!("Rejected {}: longer than {} characters", url, limit);
                return false;
            }
        }

        if self.include.iter().any(|filter| filter.matches(url, referrer)) {
            return true;
        }

        if self.exclude.iter().any(|filter| filter.matches(url, referrer)) {
            tracing::trace!("Rejected {}: matched an exclude filter", url);
            return false;
        }

        if self.is_external_url(url) {
            tracing::trace!("Rejected {}: external to {}", url, self.seed);
            return false;
        }

        match &self.robots {
            Some(robots) => {
                let allowed = robots.is_allowed(url).await;
                if !allowed {
                    tracing::trace!("Rejected {}: disallowed by robots.txt", url);
                }
                allowed
            }
            None => true,
        }
    }

    fn is_external_url(&self, url: &Url) -> bool {
        !same_host(url, &self.seed)
    }
}

//! HTML link extraction step
//!
//! This step parses HTML responses to:
//! - Record the page title on the property bag
//! - Find links to follow (from `<a>` tags and canonical links)
//! - Enqueue each link one level deeper than the page it was found on

use crate::crawler::Crawler;
use crate::model::{PropertyBag, Properties};
use crate::pipeline::PipelineStep;
use crate::url::resolve_link;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Property holding the href exactly as it appeared in the page
pub const ORIGINAL_URL: &str = "original-url";

/// Property holding the URL of the page the href appeared in
pub const ORIGINAL_REFERRER_URL: &str = "original-referrer-url";

/// A link found in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// The href attribute as written
    pub href: String,
    /// The href resolved against the page URL
    pub url: Url,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from the `<title>` tag)
    pub title: Option<String>,

    /// Crawlable links, in document order
    pub links: Vec<DiscoveredLink>,
}

/// Parses HTML content and extracts the title and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Same-page anchors
/// - Any link that does not resolve to an http(s) URL
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was served from
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<DiscoveredLink> {
    let mut links = Vec::new();
    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            links.push(DiscoveredLink {
                href: href.to_string(),
                url,
            });
        }
    };

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Pipeline step that follows the links of HTML pages
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor;

impl LinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PipelineStep for LinkExtractor {
    async fn process(&self, crawler: &Crawler, bag: &PropertyBag) -> anyhow::Result<()> {
        if !bag.is_html() {
            return Ok(());
        }

        let html = bag.body().read_to_string_lossy()?;
        let page = parse_html(&html, bag.response_url());

        if let Some(title) = page.title {
            bag.set_title(title);
        }

        let depth = bag.step().depth() + 1;
        let referrer_url = Value::String(bag.response_url().to_string());
        tracing::debug!(
            "Found {} links on {}",
            page.links.len(),
            bag.response_url()
        );

        for link in page.links {
            let mut properties = Properties::new();
            properties.insert(ORIGINAL_URL.to_string(), Value::String(link.href));
            properties.insert(ORIGINAL_REFERRER_URL.to_string(), referrer_url.clone());

            crawler
                .add_step(link.url, depth, Some(bag.step()), properties)
                .await?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "LinkExtractor"
    }
}

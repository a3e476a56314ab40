use crate::{UrlError, UrlResult};
use url::Url;

/// Returns true for the schemes the crawler can download
pub fn is_crawlable_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Parses a seed URL, requiring an http(s) scheme and a host
pub fn parse_seed(seed: &str) -> UrlResult<Url> {
    let url = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !is_crawlable_scheme(&url) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Resolves an href found in a page against the page's URL
///
/// Absolute http(s) links are taken as they are. Links with any other scheme
/// (`mailto:`, `javascript:`, `ftp:` and so on) are dropped. Everything else is
/// joined onto `base`. The fragment is removed from the result.
///
/// # Returns
///
/// * `Some(Url)` - An absolute http(s) URL
/// * `None` - The link is empty, a same-page anchor, or not crawlable
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(href).ok()?,
        Err(_) => return None,
    };

    if !is_crawlable_scheme(&resolved) || resolved.host_str().is_none() {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved)
}

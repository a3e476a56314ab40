use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Returns
///
/// * `Some(String)` - The lowercase host
/// * `None` - If the URL has no host
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if two URLs name the same host, ignoring case
///
/// Scheme and port play no part, so a site that moves from `http` to `https`
/// stays the same host.
pub fn same_host(a: &Url, b: &Url) -> bool {
    extract_domain(a) == extract_domain(b)
}

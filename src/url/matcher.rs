/// Checks if a host matches a wildcard pattern
///
/// Patterns come in three forms:
/// 1. `*` matches every host
/// 2. `example.com` matches only that host
/// 3. `*.example.com` matches the bare domain and any subdomain of it
///
/// Comparison ignores ASCII case.
///
/// # Examples
///
/// ```
/// use ripple_crawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "blog.example.com"));
/// assert!(matches_wildcard("*.example.com", "EXAMPLE.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if pattern == "*" {
        return !host.is_empty();
    }

    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&format!(".{}", base)),
        None => host == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(matches_wildcard("a.test", "a.test"));
        assert!(!matches_wildcard("a.test", "b.test"));
        assert!(!matches_wildcard("a.test", "sub.a.test"));
    }

    #[test]
    fn test_subdomain_pattern() {
        assert!(matches_wildcard("*.a.test", "a.test"));
        assert!(matches_wildcard("*.a.test", "www.a.test"));
        assert!(matches_wildcard("*.a.test", "deep.nested.a.test"));
        assert!(!matches_wildcard("*.a.test", "ba.test"));
        assert!(!matches_wildcard("*.a.test", "a.test.org"));
    }

    #[test]
    fn test_match_all_pattern() {
        assert!(matches_wildcard("*", "anything.test"));
        assert!(!matches_wildcard("*", ""));
    }

    #[test]
    fn test_case_is_ignored() {
        assert!(matches_wildcard("A.Test", "a.TEST"));
        assert!(matches_wildcard("*.a.test", "WWW.A.TEST"));
    }
}

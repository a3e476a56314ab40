use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// The URL components that take part in a dedup key
///
/// Two URLs are treated as the same page when they agree on every enabled
/// component. The default is scheme, host, port, path and query, which is the
/// request line a server actually sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlSensitivity {
    pub scheme: bool,
    pub user_info: bool,
    pub host: bool,
    pub port: bool,
    pub path: bool,
    pub query: bool,
    pub fragment: bool,
}

/// Component names accepted by [`UrlSensitivity::from_components`]
pub const URL_COMPONENTS: &[&str] = &[
    "scheme",
    "user-info",
    "host",
    "port",
    "path",
    "query",
    "fragment",
];

impl UrlSensitivity {
    /// A sensitivity with every component disabled
    pub const NONE: Self = Self {
        scheme: false,
        user_info: false,
        host: false,
        port: false,
        path: false,
        query: false,
        fragment: false,
    };

    /// Builds a sensitivity from component names
    ///
    /// # Arguments
    ///
    /// * `components` - Names from [`URL_COMPONENTS`], case-insensitive
    ///
    /// # Returns
    ///
    /// * `Ok(UrlSensitivity)` - Every name was recognized
    /// * `Err(UrlError::UnknownComponent)` - A name was not recognized
    pub fn from_components<S: AsRef<str>>(components: &[S]) -> UrlResult<Self> {
        let mut sensitivity = Self::NONE;
        for component in components {
            let name = component.as_ref().trim().to_ascii_lowercase();
            match name.as_str() {
                "scheme" => sensitivity.scheme = true,
                "user-info" => sensitivity.user_info = true,
                "host" => sensitivity.host = true,
                "port" => sensitivity.port = true,
                "path" => sensitivity.path = true,
                "query" => sensitivity.query = true,
                "fragment" => sensitivity.fragment = true,
                _ => return Err(UrlError::UnknownComponent(name)),
            }
        }
        Ok(sensitivity)
    }

    /// Returns true if at least one component is enabled
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for UrlSensitivity {
    fn default() -> Self {
        Self {
            scheme: true,
            host: true,
            port: true,
            path: true,
            query: true,
            ..Self::NONE
        }
    }
}

impl fmt::Display for UrlSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            self.scheme,
            self.user_info,
            self.host,
            self.port,
            self.path,
            self.query,
            self.fragment,
        ];
        let names: Vec<&str> = URL_COMPONENTS
            .iter()
            .zip(flags)
            .filter_map(|(name, enabled)| enabled.then_some(*name))
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Builds the dedup key for a URL
///
/// Only the components enabled in `sensitivity` are included. Ports are
/// included only when they differ from the scheme's default.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_crawl::url::{url_key, UrlSensitivity};
///
/// let url = Url::parse("http://a.test/x?q=1#top").unwrap();
/// assert_eq!(url_key(&url, UrlSensitivity::default()), "http://a.test/x?q=1");
/// ```
pub fn url_key(url: &Url, sensitivity: UrlSensitivity) -> String {
    let mut key = String::with_capacity(url.as_str().len());

    if sensitivity.scheme {
        key.push_str(url.scheme());
        key.push_str("://");
    }
    if sensitivity.user_info && !url.username().is_empty() {
        key.push_str(url.username());
        if let Some(password) = url.password() {
            key.push(':');
            key.push_str(password);
        }
        key.push('@');
    }
    if sensitivity.host {
        if let Some(host) = url.host_str() {
            key.push_str(host);
        }
    }
    if sensitivity.port {
        if let Some(port) = url.port() {
            key.push(':');
            key.push_str(&port.to_string());
        }
    }
    if sensitivity.path {
        key.push_str(url.path());
    }
    if sensitivity.query {
        if let Some(query) = url.query() {
            key.push('?');
            key.push_str(query);
        }
    }
    if sensitivity.fragment {
        if let Some(fragment) = url.fragment() {
            key.push('#');
            key.push_str(fragment);
        }
    }

    key
}

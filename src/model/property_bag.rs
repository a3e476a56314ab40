use crate::download::{DownloadMethod, ResponseBody};
use crate::model::{CrawlStep, Properties};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// The result of one download, handed to every pipeline step
///
/// Response metadata is fixed once the download completes. The extracted text,
/// the title and the named slots are writable through a shared reference so that
/// steps can annotate the bag for the steps that follow them.
#[derive(Debug)]
pub struct PropertyBag {
    step: CrawlStep,
    referrer: Option<CrawlStep>,
    method: DownloadMethod,
    status: StatusCode,
    status_description: String,
    response_url: Url,
    content_type: Option<String>,
    character_set: Option<String>,
    content_encoding: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    server: Option<String>,
    protocol_version: String,
    headers: HeaderMap,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    download_time: Duration,
    body: ResponseBody,
    annotations: Mutex<Annotations>,
}

#[derive(Debug, Default)]
struct Annotations {
    title: Option<String>,
    text: Option<String>,
    slots: Properties,
}

impl PropertyBag {
    /// Creates a bag for a completed response
    ///
    /// # Arguments
    ///
    /// * `step` - The step that was downloaded
    /// * `response_url` - The final URL after redirects
    /// * `status` - The HTTP status of the response
    /// * `body` - The sealed response body
    pub fn new(step: CrawlStep, response_url: Url, status: StatusCode, body: ResponseBody) -> Self {
        let now = Utc::now();
        Self {
            step,
            referrer: None,
            method: DownloadMethod::Get,
            status,
            status_description: status.canonical_reason().unwrap_or_default().to_string(),
            response_url,
            content_type: None,
            character_set: None,
            content_encoding: None,
            last_modified: None,
            server: None,
            protocol_version: "HTTP/1.1".to_string(),
            headers: HeaderMap::new(),
            started_at: now,
            finished_at: now,
            download_time: Duration::ZERO,
            body,
            annotations: Mutex::new(Annotations::default()),
        }
    }

    pub fn with_referrer(mut self, referrer: Option<CrawlStep>) -> Self {
        self.referrer = referrer;
        self
    }

    pub fn with_method(mut self, method: DownloadMethod) -> Self {
        self.method = method;
        self
    }

    /// Stores the response headers and derives the well-known header fields
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        let header = |name: reqwest::header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        };

        if let Some(content_type) = header(reqwest::header::CONTENT_TYPE) {
            let (media_type, charset) = split_content_type(&content_type);
            self.content_type = Some(media_type);
            self.character_set = charset;
        }
        self.content_encoding = header(reqwest::header::CONTENT_ENCODING);
        self.server = header(reqwest::header::SERVER);
        self.last_modified = header(reqwest::header::LAST_MODIFIED).and_then(|value| {
            DateTime::parse_from_rfc2822(&value)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc))
        });
        self.headers = headers;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Records when the download started and how long it took
    pub fn with_timing(mut self, started_at: DateTime<Utc>, download_time: Duration) -> Self {
        self.started_at = started_at;
        self.download_time = download_time;
        self.finished_at = started_at
            + chrono::Duration::from_std(download_time).unwrap_or_else(|_| chrono::Duration::zero());
        self
    }

    pub fn step(&self) -> &CrawlStep {
        &self.step
    }

    pub fn referrer(&self) -> Option<&CrawlStep> {
        self.referrer.as_ref()
    }

    pub fn method(&self) -> DownloadMethod {
        self.method
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_description(&self) -> &str {
        &self.status_description
    }

    pub fn response_url(&self) -> &Url {
        &self.response_url
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn character_set(&self) -> Option<&str> {
        self.character_set.as_deref()
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_deref()
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn download_time(&self) -> Duration {
        self.download_time
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Returns true if the response media type is HTML
    pub fn is_html(&self) -> bool {
        matches!(
            self.content_type.as_deref(),
            Some("text/html") | Some("application/xhtml+xml")
        )
    }

    pub fn title(&self) -> Option<String> {
        self.annotations().title.clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.annotations().title = Some(title.into());
    }

    pub fn text(&self) -> Option<String> {
        self.annotations().text.clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.annotations().text = Some(text.into());
    }

    /// Reads a named slot
    pub fn get(&self, name: &str) -> Option<Value> {
        self.annotations().slots.get(name).cloned()
    }

    /// Writes a named slot, replacing any previous value
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.annotations().slots.insert(name.into(), value);
    }

    /// Copies a queue entry's properties into the named slots
    pub fn merge_properties(&self, properties: Properties) {
        let mut annotations = self.annotations();
        for (name, value) in properties {
            annotations.slots.insert(name, value);
        }
    }

    fn annotations(&self) -> MutexGuard<'_, Annotations> {
        self.annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Splits a Content-Type header into its media type and charset parameter
fn split_content_type(value: &str) -> (String, Option<String>) {
    let mut parts = value.split(';');
    let media_type = parts
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    });

    (media_type, charset)
}

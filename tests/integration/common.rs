use ripple_crawl::config::{Config, CrawlerConfig, DownloaderConfig, StorageConfig};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server from `/`
pub fn create_test_config(server: &MockServer) -> Config {
    let seed = Url::parse(&format!("{}/", server.uri())).expect("mock server uri");
    let mut crawler = CrawlerConfig::new(seed);
    crawler.max_threads = 2;

    Config {
        crawler,
        downloader: DownloaderConfig {
            user_agent: "TestBot/1.0".to_string(),
            ..DownloaderConfig::default()
        },
        storage: StorageConfig::default(),
    }
}

/// Serves an HTML page at `route`
pub async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    let body = format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    );

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

pub async fn mount_robots(server: &MockServer, content: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(content))
        .mount(server)
        .await;
}

/// Number of requests the server received for `route`
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}

use crate::common::{create_test_config, hits, mount_page, mount_robots};
use ripple_crawl::config::{StorageBackend, StorageConfig};
use ripple_crawl::pipeline::{FnStep, LinkExtractor, PipelineStep};
use ripple_crawl::storage::CrawlQueue;
use ripple_crawl::{CrawlState, Crawler, PropertyBag};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// LinkExtractor followed by a step that records status, path and title
fn recording_pipeline(log: Arc<Mutex<Vec<(u16, String, String)>>>) -> Vec<Arc<dyn PipelineStep>> {
    let record = FnStep::new("record", move |_: &Crawler, bag: &PropertyBag| {
        log.lock().unwrap().push((
            bag.status().as_u16(),
            bag.step().url().path().to_string(),
            bag.title().unwrap_or_default(),
        ));
        Ok(())
    });
    vec![Arc::new(LinkExtractor::new()), Arc::new(record)]
}

fn sorted(log: &Arc<Mutex<Vec<(u16, String, String)>>>) -> Vec<(u16, String, String)> {
    let mut entries = log.lock().unwrap().clone();
    entries.sort();
    entries
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(
        &server,
        "/",
        "Home",
        &[&format!("{}/page1", base_url), "page2", "https://elsewhere.test/"],
    )
    .await;
    mount_page(&server, "/page1", "Page 1", &["/", "/page2"]).await;
    mount_page(&server, "/page2", "Page 2", &[]).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let config = create_test_config(&server);
    let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(crawler.state(), CrawlState::Stopped);
    assert_eq!(summary.visited, 3);
    assert_eq!(summary.registered, 3);
    assert_eq!(summary.download_errors, 0);
    assert_eq!(
        sorted(&log),
        vec![
            (200, "/".to_string(), "Home".to_string()),
            (200, "/page1".to_string(), "Page 1".to_string()),
            (200, "/page2".to_string(), "Page 2".to_string()),
        ]
    );
    assert_eq!(hits(&server, "/robots.txt").await, 1);
    assert_eq!(hits(&server, "/page2").await, 1);
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nDisallow: /admin").await;
    mount_page(&server, "/", "Home", &["/allowed", "/admin", "/Admin/users"]).await;
    mount_page(&server, "/allowed", "Allowed", &[]).await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let config = create_test_config(&server);
    let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(summary.visited, 2);
    assert_eq!(hits(&server, "/Admin/users").await, 0);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nDisallow: /").await;
    mount_page(&server, "/", "Home", &["/inside"]).await;
    mount_page(&server, "/inside", "Inside", &[]).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut config = create_test_config(&server);
    config.crawler.adhere_to_robots = false;
    let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(summary.visited, 2);
    assert_eq!(hits(&server, "/robots.txt").await, 0);
}

#[tokio::test]
async fn test_error_status_delivered_to_pipeline() {
    let server = MockServer::start().await;

    mount_robots(&server, "").await;
    mount_page(&server, "/", "Home", &["/missing"]).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let config = create_test_config(&server);
    let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(summary.download_errors, 0);
    assert_eq!(
        sorted(&log),
        vec![
            (200, "/".to_string(), "Home".to_string()),
            (404, "/missing".to_string(), String::new()),
        ]
    );
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;

    mount_robots(&server, "").await;
    mount_page(&server, "/", "Home", &["/one"]).await;
    mount_page(&server, "/one", "One", &["/two"]).await;
    mount_page(&server, "/two", "Two", &["/three"]).await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut config = create_test_config(&server);
    config.crawler.max_depth = 2;
    let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    crawler.crawl().await.expect("Crawl failed");

    assert_eq!(hits(&server, "/two").await, 1);
    assert_eq!(hits(&server, "/three").await, 0);
}

#[tokio::test]
async fn test_resume_from_file_storage() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&server, "/a", "A", &["/"]).await;
    mount_page(&server, "/b", "B", &[]).await;

    let mut config = create_test_config(&server);
    config.crawler.adhere_to_robots = false;
    config.crawler.max_threads = 1;
    config.crawler.max_crawl_count = Some(1);
    config.storage = StorageConfig {
        backend: StorageBackend::File,
        path: Some(dir.path().to_path_buf()),
    };

    // First run stops after the seed, leaving its links in the queue
    let log = Arc::new(Mutex::new(Vec::new()));
    let first = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = first.crawl().await.expect("First crawl failed");
    assert_eq!(summary.visited, 1);
    assert_eq!(first.queue().count().unwrap(), 2);
    drop(first);

    config.crawler.resume = true;
    config.crawler.max_crawl_count = None;
    let second = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
    let summary = second.crawl().await.expect("Resumed crawl failed");

    assert_eq!(summary.visited, 2);
    assert_eq!(second.queue().count().unwrap(), 0);
    assert_eq!(hits(&server, "/").await, 1);
    assert_eq!(hits(&server, "/a").await, 1);
    assert_eq!(hits(&server, "/b").await, 1);
}

#[tokio::test]
async fn test_fresh_run_discards_persisted_state() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &[]).await;

    let mut config = create_test_config(&server);
    config.crawler.adhere_to_robots = false;
    config.storage = StorageConfig {
        backend: StorageBackend::Sqlite,
        path: Some(dir.path().join("crawl.db")),
    };

    let log = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
        let crawler = Crawler::from_config(&config, recording_pipeline(log.clone())).unwrap();
        let summary = crawler.crawl().await.expect("Crawl failed");
        assert_eq!(summary.registered, 1);
    }

    assert_eq!(hits(&server, "/").await, 2);
}

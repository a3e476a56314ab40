use ripple_crawl::config::DownloaderConfig;
use ripple_crawl::download::{
    DownloadError, DownloadMethod, DownloadProgress, Downloader, HttpDownloader, ProgressCallback,
};
use ripple_crawl::CrawlStep;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn step(url: &str) -> CrawlStep {
    CrawlStep::new(Url::parse(url).unwrap(), 0)
}

async fn serve_bytes(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/octet-stream"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_response_metadata_captured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><title>Hi</title></html>", "text/html")
                .insert_header("server", "mock"),
        )
        .mount(&server)
        .await;

    let downloader = HttpDownloader::new(DownloaderConfig::default()).unwrap();
    let referrer = step(&format!("{}/", server.uri()));
    let bag = downloader
        .download(
            &step(&format!("{}/page", server.uri())),
            Some(&referrer),
            DownloadMethod::Get,
        )
        .await
        .unwrap();

    assert_eq!(bag.status().as_u16(), 200);
    assert_eq!(bag.status_description(), "OK");
    assert_eq!(bag.content_type(), Some("text/html"));
    assert!(bag.is_html());
    assert_eq!(bag.server(), Some("mock"));
    assert_eq!(bag.referrer(), Some(&referrer));
    assert_eq!(bag.response_url().path(), "/page");
    assert!(!bag.body().is_on_disk());
    assert_eq!(
        bag.body().read_to_string_lossy().unwrap(),
        "<html><title>Hi</title></html>"
    );
}

#[tokio::test]
async fn test_large_body_spills_to_disk() {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    serve_bytes(&server, "/large", body.clone()).await;

    let config = DownloaderConfig {
        max_download_size_in_ram: 1024,
        download_buffer_size: 512,
        ..DownloaderConfig::default()
    };
    let downloader = HttpDownloader::new(config).unwrap();
    let bag = downloader
        .download(&step(&format!("{}/large", server.uri())), None, DownloadMethod::Get)
        .await
        .unwrap();

    assert!(bag.body().is_on_disk());
    assert_eq!(bag.body().len(), 10_000);
    // Every step may re-read the body from the start
    assert_eq!(bag.body().to_vec().unwrap(), body);
    assert_eq!(bag.body().to_vec().unwrap(), body);
}

#[tokio::test]
async fn test_content_size_limit_is_terminal() {
    let server = MockServer::start().await;
    serve_bytes(&server, "/huge", vec![b'x'; 4096]).await;

    let config = DownloaderConfig {
        max_content_size: Some(1000),
        retry_count: 3,
        ..DownloaderConfig::default()
    };
    let downloader = HttpDownloader::new(config).unwrap();
    let result = downloader
        .download(&step(&format!("{}/huge", server.uri())), None, DownloadMethod::Get)
        .await;

    assert!(matches!(
        result,
        Err(DownloadError::ContentTooLarge { limit: 1000, .. })
    ));
    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_retries_exhausted_against_closed_port() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = DownloaderConfig {
        retry_count: 2,
        retry_wait_ms: Some(5),
        connect_timeout_ms: Some(1000),
        ..DownloaderConfig::default()
    };
    let downloader = HttpDownloader::new(config).unwrap();
    let result = downloader
        .download(
            &step(&format!("http://127.0.0.1:{}/", port)),
            None,
            DownloadMethod::Get,
        )
        .await;

    match result {
        Err(DownloadError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected retry exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_progress_reported() {
    let server = MockServer::start().await;
    serve_bytes(&server, "/file", vec![7u8; 3000]).await;

    let seen: Arc<Mutex<Vec<DownloadProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let progress: ProgressCallback = {
        let seen = seen.clone();
        Arc::new(move |p: &DownloadProgress| seen.lock().unwrap().push(p.clone()))
    };

    let downloader = HttpDownloader::new(DownloaderConfig::default()).unwrap();
    downloader
        .fetch(
            &step(&format!("{}/file", server.uri())),
            None,
            DownloadMethod::Get,
            Some(progress),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let last = seen.last().expect("at least one progress report");
    assert_eq!(last.bytes_received, 3000);
    assert_eq!(last.total_bytes, Some(3000));
    assert_eq!(last.percent_complete(), Some(100.0));
}

#[tokio::test]
async fn test_head_request() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let downloader = HttpDownloader::new(DownloaderConfig {
        read_timeout_ms: Some(2000),
        ..DownloaderConfig::default()
    })
    .unwrap();
    let bag = downloader
        .download(&step(&format!("{}/", server.uri())), None, DownloadMethod::Head)
        .await
        .unwrap();

    assert_eq!(bag.status().as_u16(), 204);
    assert!(bag.body().is_empty());
    assert_eq!(bag.method(), DownloadMethod::Head);
}

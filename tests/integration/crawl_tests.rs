//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch → extract → dual-sink cycle end-to-end over real HTTP.

use std::path::Path;
use sumi_harvest::config::{Config, CrawlerConfig, HttpConfig, OutputConfig};
use sumi_harvest::crawler::{harvest, Coordinator};
use sumi_harvest::output::{close_shared, open_sink, share, Fragment};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server
fn create_test_config(seed: String, allowed: &[&str], max_depth: u32, dir: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_url: seed,
            allowed_domains: allowed.iter().map(|d| d.to_string()).collect(),
            max_depth,
            visit_watermark: 100,
            follow_links: true,
            selectors: vec!["p".to_string()],
        },
        http: HttpConfig {
            user_agent: "TestHarvester/1.0".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 5,
        },
        output: OutputConfig {
            csv_path: dir.path().join("scrape.csv").display().to_string(),
            jsonl_path: dir.path().join("scrape.jsonl").display().to_string(),
            csv_header: false,
            sync_each_record: false,
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn read_csv(path: &Path) -> Vec<Fragment> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("Failed to open CSV output");
    reader
        .records()
        .map(|r| {
            let r = r.expect("Malformed CSV row");
            Fragment::new(&r[0], &r[1])
        })
        .collect()
}

fn read_jsonl(path: &Path) -> Vec<Fragment> {
    std::fs::read_to_string(path)
        .expect("Failed to read JSONL output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Malformed JSONL line"))
        .collect()
}

/// Runs a crawl with a fresh dual sink and closes it afterwards
async fn run_harvest(config: &Config) -> sumi_harvest::CrawlReport {
    let sink = share(open_sink(&config.output).expect("Failed to open sink"));
    let report = harvest(config, sink.clone()).await.expect("Crawl failed");
    close_shared(&sink).expect("Failed to close sink");
    report
}

#[tokio::test]
async fn test_paragraphs_recorded_in_both_files() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            "<html><body><p>A</p><p>B</p><p>C</p></body></html>".to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    let expected = vec![
        Fragment::new("p", "A"),
        Fragment::new("p", "B"),
        Fragment::new("p", "C"),
    ];
    assert_eq!(report.fragments_logged, 3);
    assert_eq!(read_csv(Path::new(&config.output.csv_path)), expected);
    assert_eq!(read_jsonl(Path::new(&config.output.jsonl_path)), expected);
}

#[tokio::test]
async fn test_depth_one_never_requests_linked_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(format!(
            r#"<html><body><p>Seed</p>
            <a href="{0}/b">B</a><a href="/c">C</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<p>B</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html("<p>C</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.visits, 1);
    assert_eq!(report.children_enqueued, 0);
    assert_eq!(
        read_csv(Path::new(&config.output.csv_path)),
        vec![Fragment::new("p", "Seed")]
    );
}

#[tokio::test]
async fn test_depth_two_follows_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>Home</p><a href="/page1">1</a><a href="/page1#top">1 again</a></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            r#"<html><body><p>Page 1</p><a href="/page2">2</a></body></html>"#.to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("<p>Page 2</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/", base_url), &["127.0.0.1"], 2, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.fetched, 2);
    let expected = vec![Fragment::new("p", "Home"), Fragment::new("p", "Page 1")];
    assert_eq!(read_csv(Path::new(&config.output.csv_path)), expected);
    assert_eq!(read_jsonl(Path::new(&config.output.jsonl_path)), expected);
}

#[tokio::test]
async fn test_seed_fetch_failure_leaves_empty_outputs() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.fragments_logged, 0);
    assert!(read_csv(Path::new(&config.output.csv_path)).is_empty());
    assert!(read_jsonl(Path::new(&config.output.jsonl_path)).is_empty());
}

#[tokio::test]
async fn test_disallowed_seed_sends_no_requests() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["example.com"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.fetched, 0);
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_redirect_outside_allowed_domains_refused() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let port = url::Url::parse(&base_url).unwrap().port().unwrap();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://localhost:{}/b", port).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<p>Escaped</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.failed, 1);
    assert!(read_csv(Path::new(&config.output.csv_path)).is_empty());
}

#[tokio::test]
async fn test_redirect_within_allowed_domains_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base_url).as_str()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html("<p>Moved</p>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/old", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.fetched, 1);
    assert_eq!(
        read_jsonl(Path::new(&config.output.jsonl_path)),
        vec![Fragment::new("p", "Moved")]
    );
}

#[tokio::test]
async fn test_configured_user_agent_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/a"))
        .and(header("user-agent", "TestHarvester/1.0"))
        .respond_with(html("<p>Hi</p>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.fragments_logged, 1);
}

#[tokio::test]
async fn test_non_html_response_not_extracted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>not html</p>", "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/data", base_url), &["127.0.0.1"], 1, &dir);

    let report = run_harvest(&config).await;

    assert_eq!(report.fetched, 1);
    assert_eq!(report.fragments_logged, 0);
}

#[tokio::test]
async fn test_dead_server_is_not_fatal() {
    // A dropped server either refuses the connection or answers 404 with no
    // mocks mounted; both are fetch failures
    let base_url = {
        let server = MockServer::start().await;
        server.uri()
    };

    let dir = TempDir::new().unwrap();
    let config = create_test_config(format!("{}/a", base_url), &["127.0.0.1"], 1, &dir);
    let sink = share(open_sink(&config.output).unwrap());

    let mut coordinator = Coordinator::with_http(&config, sink.clone()).unwrap();
    let report = coordinator.visit(&config.crawler.seed_url).await.unwrap();

    assert_eq!(report.failed, 1);
    assert!(close_shared(&sink).is_ok());
}

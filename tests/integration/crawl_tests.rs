//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end with the plain HTTP renderer.

use async_trait::async_trait;
use chrono::Utc;
use scopecrawl::config::{Config, CrawlMode, RendererEngine, ScopeConfig, StorageMode};
use scopecrawl::crawler::Coordinator;
use scopecrawl::output::{AssetJob, AssetSink, CrawlSummary};
use scopecrawl::renderer::{FetchedPage, HttpRenderer, Renderer};
use scopecrawl::state::CrawlTask;
use scopecrawl::storage::enumerate_documents;
use scopecrawl::{CrawlError, FetchError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An HTML response; wiremock's string bodies default to text/plain
fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Creates a page-crawl configuration confined to `/docs/`
fn page_config(seed: String, output: &Path, max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.mode = CrawlMode::Page;
    config.crawler.max_depth = max_depth;
    config.crawler.concurrency = 4;
    config.crawler.seeds = vec![seed];
    config.scope = ScopeConfig {
        patterns: vec!["/docs/".to_string()],
        domains: vec![],
    };
    config.renderer.engine = RendererEngine::Http;
    config.renderer.timeout_secs = 5;
    config.renderer.max_attempts = 3;
    config.renderer.backoff_ms = 10;
    config.renderer.screenshots = false;
    config.output.directory = output.to_path_buf();
    config.output.storage_mode = StorageMode::Flat;
    config
}

async fn run(config: Config) -> CrawlSummary {
    let renderer: Arc<dyn Renderer> =
        Arc::new(HttpRenderer::from_config(&config.renderer).expect("Failed to build renderer"));
    Coordinator::new(config, renderer)
        .run(CancellationToken::new())
        .await
        .expect("Crawl failed")
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    files
}

/// Mounts the depth/scope fixture:
///
/// a.html -> b.html, /other/c.html
/// b.html -> /docs/d/e.html
async fn mount_docs_fixture(server: &MockServer, base: &str, depth_one_only: bool) {
    mount_page(
        server,
        "/docs/a.html",
        format!(
            r#"<html><body><a href="{base}/docs/b.html">B</a><a href="/other/c.html">C</a></body></html>"#
        ),
        1,
    )
    .await;
    mount_page(
        server,
        "/docs/b.html",
        r#"<html><body><a href="d/e.html">E</a></body></html>"#.to_string(),
        1,
    )
    .await;
    mount_page(
        server,
        "/docs/d/e.html",
        "<html><body>deep</body></html>".to_string(),
        if depth_one_only { 0 } else { 1 },
    )
    .await;
    mount_page(server, "/other/c.html", String::new(), 0).await;
}

#[tokio::test]
async fn test_depth_budget_and_scope() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_docs_fixture(&server, &base, true).await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/a.html"), out.path(), 1)).await;

    assert_eq!(summary.counts.persisted, 2);
    assert_eq!(summary.counts.failed, 0);
    assert_eq!(summary.counts.rejected, 1);
    assert_eq!(summary.counts.depth_exceeded, 1);
    assert_eq!(summary.documents_on_disk, 2);
    assert!(!summary.cancelled);
    assert_eq!(list_dir(out.path()).len(), 2);
}

#[tokio::test]
async fn test_unlimited_depth_reaches_everything_in_scope() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_docs_fixture(&server, &base, false).await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/a.html"), out.path(), 0)).await;

    assert_eq!(summary.counts.persisted, 3);
    assert_eq!(summary.counts.depth_exceeded, 0);
    assert_eq!(summary.counts.rejected, 1);
}

#[tokio::test]
async fn test_flat_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/docs/a.html"))
        .respond_with(html(r#"<a href="/docs/b.html">b</a>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/b.html"))
        .respond_with(html(r#"<a href="/docs/a.html">a</a>"#))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let seed = format!("{base}/docs/a.html");

    run(page_config(seed.clone(), out.path(), 0)).await;
    let first = list_dir(out.path());
    run(page_config(seed, out.path(), 0)).await;
    let second = list_dir(out.path());

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_hierarchical_layout_mirrors_paths() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_docs_fixture(&server, &base, false).await;

    let out = TempDir::new().unwrap();
    let mut config = page_config(format!("{base}/docs/a.html"), out.path(), 0);
    config.output.storage_mode = StorageMode::Hierarchical;
    run(config).await;

    let docs = enumerate_documents(out.path(), "html").unwrap();
    assert_eq!(
        docs,
        vec![
            out.path().join("docs/a.html"),
            out.path().join("docs/b.html"),
            out.path().join("docs/d/e.html"),
        ]
    );
}

#[tokio::test]
async fn test_hierarchical_root_fails_but_links_are_followed() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", r#"<a href="/docs/a.html">a</a>"#.to_string(), 1).await;
    mount_page(&server, "/docs/a.html", "<p>a</p>".to_string(), 1).await;

    let out = TempDir::new().unwrap();
    let mut config = page_config(format!("{base}/"), out.path(), 0);
    config.scope.domains = vec!["127.0.0.1".to_string()];
    config.output.storage_mode = StorageMode::Hierarchical;
    let summary = run(config).await;

    assert_eq!(summary.counts.failed, 1);
    assert_eq!(summary.counts.persisted, 1);
    assert!(out.path().join("docs/a.html").is_file());
}

#[tokio::test]
async fn test_hierarchical_page_and_directory_share_a_segment() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/docs/v1.2", r#"<a href="v1.2/page">p</a>"#.to_string(), 1).await;
    mount_page(&server, "/docs/v1.2/page", "<p>page</p>".to_string(), 1).await;

    let out = TempDir::new().unwrap();
    let mut config = page_config(format!("{base}/docs/v1.2"), out.path(), 0);
    config.output.storage_mode = StorageMode::Hierarchical;
    let summary = run(config).await;

    assert_eq!(summary.counts.persisted, 2);
    assert_eq!(summary.counts.failed, 0);
    assert_eq!(enumerate_documents(out.path(), "html").unwrap().len(), 2);
    assert!(out.path().join("docs/v1.2").is_dir());
}

#[tokio::test]
async fn test_page_crawl_skips_binary_documents() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/docs/a.html",
        r#"<a href="/docs/manual.pdf">manual</a><a href="/docs/b.html">b</a>"#.to_string(),
        1,
    )
    .await;
    mount_page(&server, "/docs/b.html", "<p>b</p>".to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/docs/manual.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/a.html"), out.path(), 0)).await;

    assert_eq!(summary.counts.persisted, 2);
    assert_eq!(summary.counts.rejected, 1);

    let docs = enumerate_documents(out.path(), "html").unwrap();
    assert_eq!(docs.len(), 2);
    for doc in docs {
        assert!(!std::fs::read(&doc).unwrap().starts_with(b"%PDF"));
    }
}

#[tokio::test]
async fn test_non_html_seed_is_not_persisted() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/docs/manual"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/manual"), out.path(), 0)).await;

    assert_eq!(summary.counts.persisted, 0);
    assert_eq!(summary.counts.failed, 1);
    assert!(enumerate_documents(out.path(), "html").unwrap().is_empty());
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/docs/a.html",
        r#"<a href="/docs/missing.html">gone</a>"#.to_string(),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/a.html"), out.path(), 0)).await;

    assert_eq!(summary.counts.persisted, 1);
    assert_eq!(summary.counts.failed, 1);
    assert_eq!(list_dir(out.path()).len(), 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Mounted first, so it answers until exhausted
    Mock::given(method("GET"))
        .and(path("/docs/flaky.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/flaky.html", "<p>finally</p>".to_string(), 1).await;

    let out = TempDir::new().unwrap();
    let summary = run(page_config(format!("{base}/docs/flaky.html"), out.path(), 0)).await;

    assert_eq!(summary.counts.persisted, 1);
    assert_eq!(summary.counts.failed, 0);
}

#[tokio::test]
async fn test_cancellation_drains_in_flight_work() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/docs/slow.html"))
        .respond_with(
            html(r#"<a href="/docs/next-1.html">1</a><a href="/docs/next-2.html">2</a>"#)
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/next-1.html", String::new(), 0).await;
    mount_page(&server, "/docs/next-2.html", String::new(), 0).await;

    let out = TempDir::new().unwrap();
    let config = page_config(format!("{base}/docs/slow.html"), out.path(), 0);
    let renderer: Arc<dyn Renderer> = Arc::new(HttpRenderer::from_config(&config.renderer).unwrap());

    let cancel = CancellationToken::new();
    let run = tokio::spawn(Coordinator::new(config, renderer).run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("Crawl did not stop")
        .unwrap()
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.counts.persisted, 1);

    let files = list_dir(out.path());
    assert_eq!(files.len(), 1);
    assert!(files.iter().all(|f| f.extension().unwrap() == "html"));
}

/// Collects asset jobs in memory
#[derive(Default)]
struct CollectingSink {
    jobs: Mutex<Vec<AssetJob>>,
}

#[async_trait]
impl AssetSink for CollectingSink {
    async fn submit(&self, job: AssetJob) -> Result<(), CrawlError> {
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

fn asset_config(seed: String, output: &Path) -> Config {
    let mut config = page_config(String::new(), output, 1);
    config.crawler.mode = CrawlMode::Asset;
    config.crawler.seeds.clear();
    config.assets.domain = "127.0.0.1".to_string();
    config.assets.seeds = vec![seed];
    config
}

async fn mount_asset_fixture(server: &MockServer) {
    mount_page(
        server,
        "/p1.html",
        r#"<a href="/files/deep/file.pdf">pdf</a><a href="/p2.html">p2</a>"#.to_string(),
        1,
    )
    .await;
    mount_page(
        server,
        "/p2.html",
        r#"<a href="/files/deep/file.pdf">same pdf</a><a href="/p1.html">back</a><a href="/p3.html">p3</a>"#.to_string(),
        1,
    )
    .await;
    // Deeper than the page-crawl budget; asset harvesting ignores depth
    mount_page(server, "/p3.html", "<p>end</p>".to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/files/deep/file.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_asset_harvest_queues_each_document_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_asset_fixture(&server).await;

    let out = TempDir::new().unwrap();
    let config = asset_config(format!("{base}/p1.html"), out.path());
    let renderer: Arc<dyn Renderer> = Arc::new(HttpRenderer::from_config(&config.renderer).unwrap());
    let sink = Arc::new(CollectingSink::default());

    let summary = Coordinator::new(config, renderer)
        .with_asset_sink(sink.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    let jobs = sink.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source_url, format!("{base}/files/deep/file.pdf"));
    assert_eq!(jobs[0].target_dir, out.path());
    assert_eq!(summary.counts.persisted, 3);
    assert_eq!(summary.counts.assets_queued, 1);

    // No page bodies are persisted in asset mode
    assert!(enumerate_documents(out.path(), "html").unwrap().is_empty());
}

#[tokio::test]
async fn test_asset_harvest_default_queue_file() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_asset_fixture(&server).await;

    let out = TempDir::new().unwrap();
    let config = asset_config(format!("{base}/p1.html"), out.path());
    let summary = scopecrawl::crawl(config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.counts.assets_queued, 1);

    let content = std::fs::read_to_string(out.path().join("assets.jsonl")).unwrap();
    let jobs: Vec<AssetJob> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].source_url.ends_with("/files/deep/file.pdf"));
}

/// Serves a fully connected graph of pages and counts fetches per URL
struct GraphRenderer {
    pages: usize,
    fetches: Mutex<HashMap<String, usize>>,
}

#[async_trait]
impl Renderer for GraphRenderer {
    async fn fetch(&self, task: &CrawlTask) -> Result<FetchedPage, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(task.url.to_string())
            .or_default() += 1;

        tokio::time::sleep(Duration::from_millis(2)).await;

        let links: String = (0..self.pages)
            .map(|i| format!(r#"<a href="/docs/{i}.html">{i}</a><a href="/docs/{i}.html#top">top</a>"#))
            .collect();

        Ok(FetchedPage {
            url: task.url.clone(),
            final_url: task.url.clone(),
            body: format!("<html><body>{links}</body></html>").into_bytes(),
            content_type: Some("text/html".to_string()),
            fetched_at: Utc::now(),
            snapshot: None,
        })
    }

    fn name(&self) -> &'static str {
        "graph"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_fetch_each_url_once() {
    let out = TempDir::new().unwrap();
    let mut config = page_config("https://example.org/docs/0.html".to_string(), out.path(), 0);
    config.crawler.concurrency = 8;
    config.crawler.seeds = vec![
        "https://example.org/docs/0.html".to_string(),
        "https://example.org/docs/0.html#again".to_string(),
        "https://EXAMPLE.org/docs/1.html".to_string(),
    ];

    let renderer = Arc::new(GraphRenderer {
        pages: 25,
        fetches: Mutex::new(HashMap::new()),
    });

    let summary = Coordinator::new(config, renderer.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    let fetches = renderer.fetches.lock().unwrap();
    assert_eq!(fetches.len(), 25);
    assert!(fetches.values().all(|&count| count == 1));
    assert_eq!(summary.counts.persisted, 25);
    assert_eq!(summary.documents_on_disk, 25);

    let expected: Vec<Url> = (0..25)
        .map(|i| Url::parse(&format!("https://example.org/docs/{i}.html")).unwrap())
        .collect();
    assert!(expected.iter().all(|u| fetches.contains_key(u.as_str())));
}

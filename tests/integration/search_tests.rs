//! Integration tests for ranking, searching and highlighting
//!
//! A small site is crawled from a wiremock server into an on-disk index,
//! then ranked and queried.

use ripple_search::config::{CrawlerConfig, UserAgentConfig};
use ripple_search::crawler::{build_http_client, Fetcher};
use ripple_search::output::{document_key, Highlighter};
use ripple_search::storage::{IndexStore, SqliteIndexStore};
use ripple_search::{Crawler, PageRankEngine, QueryMatcher};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html",
    )
}

/// Serves a home page linking to three documents
///
/// d1 = "alpha beta alpha", d2 = "beta gamma", d3 = "alpha beta".
/// d3 answers only once, so a second fetch of it fails.
async fn start_site() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"home alpha <a href="/d1">first</a> <a href="/d2">second</a> <a href="/d3">third</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d1"))
        .respond_with(html("alpha beta alpha"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d2"))
        .respond_with(html("beta gamma"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d3"))
        .respond_with(html("alpha beta"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    server
}

/// Crawls the site two levels deep into a fresh index
async fn crawl_site(server: &MockServer) -> (TempDir, Arc<SqliteIndexStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(SqliteIndexStore::open(&dir.path().join("index.db"), 4).unwrap());

    let config = CrawlerConfig {
        max_depth: 2,
        max_indexed_pages: 50,
        max_links_per_page: 100,
        max_concurrent_fetches: 4,
        fetch_timeout_secs: 5,
        seeds: Vec::new(),
    };
    let crawler = Crawler::new(config, &test_user_agent(), store.clone()).unwrap();
    let report = crawler.crawl(&[format!("{}/", server.uri())], 2).await;
    assert_eq!(report.pages_indexed, 4);

    (dir, store)
}

#[tokio::test]
async fn test_search_after_crawl() {
    let server = start_site().await;
    let (_dir, store) = crawl_site(&server).await;
    let base = server.uri();
    let matcher = QueryMatcher::new(store.clone());

    let rows = matcher.match_rows("alpha beta").unwrap();
    let d1 = store.url_id(&format!("{}/d1", base)).unwrap().unwrap();
    let d3 = store.url_id(&format!("{}/d3", base)).unwrap().unwrap();
    assert_eq!(rows.iter().filter(|r| r.url_id == d1).count(), 2);
    assert_eq!(rows.iter().filter(|r| r.url_id == d3).count(), 1);
    assert_eq!(rows.len(), 3);

    let ranked = matcher.ranked("Alpha, BETA!").unwrap();
    let urls: Vec<&str> = ranked.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![format!("{}/d1", base), format!("{}/d3", base)]);
    assert_eq!(ranked[0].score, 1.0);
    assert_eq!(ranked[1].score, 0.0);

    assert!(matcher.ranked("alpha").unwrap().is_empty());
    assert!(matcher.ranked("alpha delta").unwrap().is_empty());
}

#[tokio::test]
async fn test_rank_after_crawl() {
    let server = start_site().await;
    let (_dir, store) = crawl_site(&server).await;
    let base = server.uri();

    let report = PageRankEngine::new(store.clone()).rank(5).unwrap();
    assert_eq!(report.urls, 4);
    assert_eq!(report.links, 3);
    assert_eq!(report.iterations, 5);

    let home = store.url_id(&format!("{}/", base)).unwrap().unwrap();
    let d1 = store.url_id(&format!("{}/d1", base)).unwrap().unwrap();

    let home_score = store.page_rank(home).unwrap().unwrap();
    let d1_score = store.page_rank(d1).unwrap().unwrap();
    assert!((home_score - 0.15).abs() < 1e-9);
    assert!((d1_score - (0.15 + 0.85 * 0.15 / 3.0)).abs() < 1e-9);

    let top = store.top_page_ranks(1).unwrap();
    assert_ne!(top[0].0, format!("{}/", base));
    assert_eq!(store.statistics().unwrap().scored_urls, 4);
}

#[tokio::test]
async fn test_highlight_writes_marked_documents() {
    let server = start_site().await;
    let (_dir, store) = crawl_site(&server).await;
    let base = server.uri();

    let output = TempDir::new().expect("Failed to create output dir");
    let client = build_http_client(&test_user_agent(), Duration::from_secs(5)).unwrap();
    let highlighter = Highlighter::new(
        QueryMatcher::new(store.clone()),
        Fetcher::new(client, 100),
        output.path(),
    );

    let report = highlighter.highlight("alpha beta").await.unwrap();

    // d3 only answered the crawl's request
    assert_eq!(report.skipped, vec![format!("{}/d3", base)]);
    assert_eq!(report.written.len(), 1);

    let d1_url = format!("{}/d1", base);
    let expected = output
        .path()
        .join(format!("highlighted_{}.html", document_key(&d1_url)));
    assert_eq!(report.written[0], expected);

    let content = std::fs::read_to_string(&expected).unwrap();
    assert!(content.contains("<mark>alpha</mark> <mark>beta</mark> <mark>alpha</mark>"));
}

#[tokio::test]
async fn test_highlight_without_results_writes_nothing() {
    let server = start_site().await;
    let (_dir, store) = crawl_site(&server).await;

    let output = TempDir::new().expect("Failed to create output dir");
    let target = output.path().join("out");
    let client = build_http_client(&test_user_agent(), Duration::from_secs(5)).unwrap();
    let highlighter = Highlighter::new(QueryMatcher::new(store), Fetcher::new(client, 100), &target);

    let report = highlighter.highlight("gamma delta").await.unwrap();

    assert!(report.written.is_empty());
    assert!(report.skipped.is_empty());
    assert!(!target.exists());
}

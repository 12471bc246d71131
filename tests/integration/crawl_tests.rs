//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! crawls end-to-end against an on-disk index.

use ripple_search::config::{CrawlerConfig, UserAgentConfig};
use ripple_search::storage::{IndexStore, SqliteIndexStore};
use ripple_search::Crawler;
use std::path::Path;
use std::sync::Arc;
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

fn test_config(max_indexed_pages: usize, max_concurrent_fetches: usize) -> CrawlerConfig {
    CrawlerConfig {
        max_depth: 2,
        max_indexed_pages,
        max_links_per_page: 100,
        max_concurrent_fetches,
        fetch_timeout_secs: 5,
        seeds: Vec::new(),
    }
}

/// Opens a pooled on-disk index inside a fresh temp directory
fn temp_store() -> (TempDir, Arc<SqliteIndexStore>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteIndexStore::open(&dir.path().join("index.db"), 4)
        .expect("Failed to open index");
    (dir, Arc::new(store))
}

/// Makes every page whose body contains `word` fail to index
fn reject_word(db_path: &Path, word: &str) {
    let conn = rusqlite::Connection::open(db_path).expect("Failed to open index");
    conn.execute_batch(&format!(
        "CREATE TRIGGER reject_word BEFORE INSERT ON word_locations
         WHEN (SELECT word FROM words WHERE id = NEW.word_id) = '{}'
         BEGIN SELECT RAISE(ABORT, 'word rejected'); END;",
        word
    ))
    .expect("Failed to install trigger");
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>t</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_respects_depth() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"Home page <a href="/page1">Page one</a> <a href="/page2">Page two</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/page1", r#"First <a href="/page3">deeper</a>"#, 1).await;
    mount_page(&server, "/page2", "Second", 1).await;
    // Discovered at level 2, would be fetched at level 3
    mount_page(&server, "/page3", "Never fetched", 0).await;

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(50, 4), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 2).await;

    assert_eq!(report.levels_run, 2);
    assert_eq!(report.pages_indexed, 3);
    assert_eq!(report.fetch_failures, 0);
    assert!(!report.cap_reached);

    let stats = store.statistics().unwrap();
    // page3 exists as a link endpoint only
    assert_eq!(stats.urls, 4);
    assert_eq!(stats.links, 3);
    assert_eq!(stats.domains, 1);

    let page3 = store.url_id(&format!("{}/page3", base)).unwrap().unwrap();
    let page1 = store.url_id(&format!("{}/page1", base)).unwrap().unwrap();
    assert_eq!(store.incoming_links(page3).unwrap()[0].from_url, page1);

    let never = store.word_id("never").unwrap();
    assert!(never.is_none());
}

#[tokio::test]
async fn test_cycle_visited_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/a">to a</a>"#, 1).await;
    mount_page(&server, "/a", r#"<a href="/">back home</a>"#, 1).await;

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(50, 4), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 5).await;

    assert_eq!(report.pages_indexed, 2);
    assert_eq!(report.urls_visited, 2);
    assert_eq!(report.levels_run, 2);
    assert_eq!(store.statistics().unwrap().links, 2);
}

#[tokio::test]
async fn test_visited_set_is_per_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "again and again", 2).await;

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(50, 4), &test_user_agent(), store.clone()).unwrap();

    let seeds = [format!("{}/", base)];
    assert_eq!(crawler.crawl(&seeds, 1).await.pages_indexed, 1);
    assert_eq!(crawler.crawl(&seeds, 1).await.pages_indexed, 1);

    // Re-indexing the same page adds nothing new
    let again = store.word_id("again").unwrap().unwrap();
    assert_eq!(store.word_locations_for(again).unwrap().len(), 2);
}

#[tokio::test]
async fn test_indexed_page_cap() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..5)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&links))
        .mount(&server)
        .await;
    for i in 0..5 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html("leaf"))
            .mount(&server)
            .await;
    }

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(2, 1), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 3).await;

    assert_eq!(report.pages_indexed, 2);
    assert!(report.cap_reached);
    assert_eq!(report.levels_run, 2);

    // One worker: once the second page is indexed the rest are skipped unfetched
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let leaf = store.word_id("leaf").unwrap().unwrap();
    assert_eq!(store.word_locations_for(leaf).unwrap().len(), 1);
}

#[tokio::test]
async fn test_cap_never_exceeded_with_many_workers() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&links))
        .mount(&server)
        .await;
    for i in 0..20 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html("leaf"))
            .mount(&server)
            .await;
    }

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(5, 16), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 2).await;

    assert_eq!(report.pages_indexed, 5);
    assert!(report.cap_reached);

    let leaf = store.word_id("leaf").unwrap().unwrap();
    assert_eq!(store.word_locations_for(leaf).unwrap().len(), 4);
}

#[tokio::test]
async fn test_fetch_failures_are_isolated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<a href="/ok">ok</a> <a href="/missing">missing</a> <a href="/data">data</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/ok", "still indexed", 1).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"a": 1}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(50, 4), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 2).await;

    assert_eq!(report.pages_indexed, 2);
    assert_eq!(report.fetch_failures, 2);
    assert!(store.word_id("indexed").unwrap().is_some());
}

#[tokio::test]
async fn test_storage_failures_are_isolated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"start <a href="/bad">bad</a> <a href="/mid">mid</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/bad", r#"poison <a href="/elsewhere">elsewhere</a>"#, 1).await;
    mount_page(&server, "/mid", r#"middle <a href="/last">last</a>"#, 1).await;
    // Only reachable if the failed page handed its slot back
    mount_page(&server, "/last", "reached", 1).await;

    let (dir, store) = temp_store();
    reject_word(&dir.path().join("index.db"), "poison");
    let crawler = Crawler::new(test_config(3, 4), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 3).await;

    assert_eq!(report.storage_failures, 1);
    assert_eq!(report.pages_indexed, 3);
    assert_eq!(report.levels_run, 3);
    assert_eq!(report.pages_discarded, 0);
    assert!(report.cap_reached);

    assert!(store.word_id("middle").unwrap().is_some());
    assert!(store.word_id("reached").unwrap().is_some());

    // The failed page left no rows of its own
    assert!(store.word_id("poison").unwrap().is_none());
    assert!(store.word_id("elsewhere").unwrap().is_none());
    assert!(store.url_id(&format!("{}/elsewhere", base)).unwrap().is_none());
    let bad = store.url_id(&format!("{}/bad", base)).unwrap().unwrap();
    assert!(store.outgoing_links(bad).unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_pages_share_words() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..12)
        .map(|i| format!(r#"<a href="/p{}">shared link</a> "#, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&links))
        .mount(&server)
        .await;
    for i in 0..12 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html(r#"common words everywhere <a href="/">shared link</a>"#))
            .mount(&server)
            .await;
    }

    let (_dir, store) = temp_store();
    let crawler = Crawler::new(test_config(50, 8), &test_user_agent(), store.clone()).unwrap();

    let report = crawler.crawl(&[format!("{}/", base)], 2).await;
    assert_eq!(report.pages_indexed, 13);

    let stats = store.statistics().unwrap();
    // shared, link, common, words, everywhere
    assert_eq!(stats.words, 5);
    assert_eq!(stats.urls, 13);
    assert_eq!(stats.links, 24);
}

#[tokio::test]
async fn test_spawned_crawl_reports() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", "background", 1).await;

    let (_dir, store) = temp_store();
    let crawler = Arc::new(Crawler::new(test_config(50, 4), &test_user_agent(), store.clone()).unwrap());

    let handle = crawler.spawn(vec![format!("{}/", base)], 1);
    let report = handle.await.unwrap();

    assert_eq!(report.pages_indexed, 1);
    assert!(store.word_id("background").unwrap().is_some());
}

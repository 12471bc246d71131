//! Crawler coordinator - level-synchronous crawl orchestration
//!
//! This module contains the crawl loop that coordinates:
//! - One concurrent task per unvisited frontier URL, bounded by a semaphore
//! - A barrier after every level (all tasks finish before the next level starts)
//! - The global indexed-page cap, polled cooperatively by every task
//! - Failure isolation: a failing task contributes nothing and siblings carry on

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::indexer::index_page;
use crate::crawler::scheduler::{CrawlState, Frontier};
use crate::storage::IndexStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

/// Summary of one crawl invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Levels that launched at least one task
    pub levels_run: u32,

    /// Pages whose content reached the index
    pub pages_indexed: usize,

    /// Tasks whose fetch failed
    pub fetch_failures: usize,

    /// Tasks whose indexing failed in storage
    pub storage_failures: usize,

    /// Pages fetched after the cap was reached and thrown away
    pub pages_discarded: usize,

    /// Distinct URLs handed to a task
    pub urls_visited: usize,

    /// Whether the crawl stopped on the indexed-page cap
    pub cap_reached: bool,
}

/// What a single crawl task produced
#[derive(Debug)]
enum TaskOutcome {
    /// Indexed; carries the discovered link targets
    Indexed(Vec<String>),
    /// Not started because the cap was already reached
    Skipped,
    /// Fetched, but the cap was reached before indexing
    Discarded,
    FetchFailed,
    StorageFailed,
}

/// Breadth-first crawler writing into an `IndexStore`
///
/// A `Crawler` holds no per-crawl state: every call to [`Crawler::crawl`]
/// starts with a fresh visited set and page count.
pub struct Crawler {
    config: Arc<CrawlerConfig>,
    store: Arc<dyn IndexStore>,
    fetcher: Fetcher,
    permits: Arc<Semaphore>,
}

impl Crawler {
    /// Creates a crawler with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl limits
    /// * `user_agent` - Identification sent with every request
    /// * `store` - The index written by the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to crawl
    /// * `Err(SearchError)` - The HTTP client could not be built
    pub fn new(
        config: CrawlerConfig,
        user_agent: &UserAgentConfig,
        store: Arc<dyn IndexStore>,
    ) -> crate::Result<Self> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let fetcher = Fetcher::new(client, config.max_links_per_page);
        Ok(Self::with_fetcher(config, fetcher, store))
    }

    /// Creates a crawler around an existing fetcher
    pub fn with_fetcher(config: CrawlerConfig, fetcher: Fetcher, store: Arc<dyn IndexStore>) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1)));
        Self {
            config: Arc::new(config),
            store,
            fetcher,
            permits,
        }
    }

    /// Crawls from `seeds` for `max_depth` fetch rounds
    ///
    /// Level `k` fetches every URL discovered at level `k - 1` that was not
    /// visited before (exact string match). Level 1 fetches the seeds.
    /// The crawl stops early when the frontier runs dry or the indexed-page
    /// cap is reached. Individual failures are logged and counted; this
    /// method itself never fails.
    ///
    /// # Arguments
    ///
    /// * `seeds` - Absolute URLs of the first level
    /// * `max_depth` - Number of fetch rounds
    pub async fn crawl(&self, seeds: &[String], max_depth: u32) -> CrawlReport {
        let state = Arc::new(CrawlState::new(self.config.max_indexed_pages));
        let mut report = CrawlReport::default();
        let mut frontier: Frontier = seeds.iter().cloned().collect();
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl from {} seeds, max depth {}, cap {} pages",
            frontier.len(),
            max_depth,
            self.config.max_indexed_pages
        );

        for depth in 1..=max_depth {
            if state.cap_reached() {
                tracing::info!("Indexed page cap reached, not starting level {}", depth);
                break;
            }
            if frontier.is_empty() {
                tracing::info!("Frontier is empty, crawl complete after {} levels", depth - 1);
                break;
            }

            let mut tasks = JoinSet::new();
            for url in frontier.into_urls() {
                if !state.mark_visited(&url) {
                    continue;
                }
                let task = CrawlTask {
                    store: Arc::clone(&self.store),
                    fetcher: self.fetcher.clone(),
                    state: Arc::clone(&state),
                    permits: Arc::clone(&self.permits),
                };
                tasks.spawn(task.run(url));
            }

            if tasks.is_empty() {
                tracing::info!("Nothing new to fetch at level {}", depth);
                frontier = Frontier::new();
                continue;
            }

            report.levels_run = depth;
            tracing::info!("Level {}: fetching {} URLs", depth, tasks.len());

            // Barrier: the next frontier is complete once every task has joined
            let mut next = Frontier::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(TaskOutcome::Indexed(links)) => {
                        report.pages_indexed += 1;
                        next.extend(links);
                    }
                    Ok(TaskOutcome::Skipped) => {}
                    Ok(TaskOutcome::Discarded) => report.pages_discarded += 1,
                    Ok(TaskOutcome::FetchFailed) => report.fetch_failures += 1,
                    Ok(TaskOutcome::StorageFailed) => report.storage_failures += 1,
                    Err(e) => tracing::error!("Crawl task aborted: {}", e),
                }
            }

            tracing::info!(
                "Level {} done: {} pages indexed so far, {} URLs discovered",
                depth,
                report.pages_indexed,
                next.len()
            );
            frontier = next;
        }

        report.urls_visited = state.visited_count();
        report.cap_reached = state.cap_reached();

        tracing::info!(
            "Crawl finished in {:.2}s: {} pages indexed, {} fetch failures, {} storage failures",
            start_time.elapsed().as_secs_f64(),
            report.pages_indexed,
            report.fetch_failures,
            report.storage_failures
        );

        report
    }

    /// Starts a crawl in the background
    ///
    /// The returned handle resolves to the crawl's report; dropping it lets
    /// the crawl run to completion unobserved.
    pub fn spawn(self: Arc<Self>, seeds: Vec<String>, max_depth: u32) -> JoinHandle<CrawlReport> {
        tokio::spawn(async move { self.crawl(&seeds, max_depth).await })
    }
}

/// Everything one task needs, owned so the task can run on any worker
struct CrawlTask {
    store: Arc<dyn IndexStore>,
    fetcher: Fetcher,
    state: Arc<CrawlState>,
    permits: Arc<Semaphore>,
}

impl CrawlTask {
    async fn run(self, url: String) -> TaskOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return TaskOutcome::Skipped;
        };

        if self.state.cap_reached() {
            tracing::debug!("Skipping {}: page cap reached", url);
            return TaskOutcome::Skipped;
        }

        let page = match self.fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("{}", e);
                return TaskOutcome::FetchFailed;
            }
        };

        if !self.state.try_reserve_slot() {
            tracing::debug!("Discarding {}: page cap reached during fetch", url);
            return TaskOutcome::Discarded;
        }

        let store = Arc::clone(&self.store);
        let indexed = tokio::task::spawn_blocking(move || index_page(store.as_ref(), &page)).await;

        match indexed {
            Ok(Ok(links)) => TaskOutcome::Indexed(links),
            Ok(Err(e)) => {
                self.state.release_slot();
                tracing::warn!("Failed to index {}: {}", url, e);
                TaskOutcome::StorageFailed
            }
            Err(e) => {
                self.state.release_slot();
                tracing::error!("Indexing task for {} aborted: {}", url, e);
                TaskOutcome::StorageFailed
            }
        }
    }
}

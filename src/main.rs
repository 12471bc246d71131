//! Ripple-Search main entry point
//!
//! This is the command-line interface for crawling, ranking and querying the index.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ripple_search::config::{load_config, validate_seed, Config};
use ripple_search::crawler::{build_http_client, Crawler, Fetcher};
use ripple_search::output::{load_report, print_statistics, Highlighter};
use ripple_search::storage::open_index_store;
use ripple_search::{IndexStore, PageRankEngine, QueryMatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Ripple-Search: crawl, rank and search a small web graph
///
/// Pages are crawled level by level into a SQLite index, ranked with
/// PageRank and queried with two-term proximity queries.
#[derive(Parser, Debug)]
#[command(name = "ripple-search")]
#[command(version)]
#[command(about = "A small crawl-index-rank-search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from the given URLs (or the configured seeds)
    Crawl {
        /// Number of fetch rounds (defaults to crawler.max-depth)
        #[arg(long)]
        depth: Option<u32>,

        /// Seed URLs
        #[arg(value_name = "URL")]
        urls: Vec<String>,
    },

    /// Recompute PageRank for every indexed URL
    Rank {
        /// Number of iterations (defaults to ranking.iterations)
        #[arg(long)]
        iterations: Option<u32>,
    },

    /// Print every co-occurrence of the first two query terms
    Matches {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Print the best matching URLs with normalized scores
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Write highlighted copies of the best matching pages
    Highlight {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Show index statistics
    Stats,

    /// Fetch one page and print its body text
    Body {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Fetch one page and print its outgoing links
    Links {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    match cli.command {
        Command::Crawl { depth, urls } => handle_crawl(&config, depth, urls).await,
        Command::Rank { iterations } => handle_rank(&config, iterations).await,
        Command::Matches { query } => handle_matches(&config, &query).await,
        Command::Search { query } => handle_search(&config, &query).await,
        Command::Highlight { query } => handle_highlight(&config, &query).await,
        Command::Stats => handle_stats(&config),
        Command::Body { url } => handle_body(&config, &url).await,
        Command::Links { url } => handle_links(&config, &url).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_search=info,warn"),
            1 => EnvFilter::new("ripple_search=debug,info"),
            2 => EnvFilter::new("ripple_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn IndexStore>> {
    let path = Path::new(&config.storage.database_path);
    let store = open_index_store(path, config.storage.pool_size)
        .with_context(|| format!("Failed to open index {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_fetcher(config: &Config) -> anyhow::Result<Fetcher> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.fetch_timeout_secs),
    )?;
    Ok(Fetcher::new(client, config.crawler.max_links_per_page))
}

/// Handles `crawl`: runs the crawl in the background and waits for its report
async fn handle_crawl(
    config: &Config,
    depth: Option<u32>,
    urls: Vec<String>,
) -> anyhow::Result<()> {
    let seeds = if urls.is_empty() {
        config.crawler.seeds.clone()
    } else {
        for url in &urls {
            validate_seed(url)?;
        }
        urls
    };
    if seeds.is_empty() {
        bail!("No seed URLs given on the command line or in crawler.seeds");
    }
    let depth = depth.unwrap_or(config.crawler.max_depth);

    let store = open_store(config)?;
    let crawler = Arc::new(Crawler::new(
        config.crawler.clone(),
        &config.user_agent,
        store,
    )?);

    tracing::info!("Crawling started with {} seeds", seeds.len());
    let report = crawler.spawn(seeds, depth).await?;

    println!("=== Crawl Report ===\n");
    println!("  Levels run: {}", report.levels_run);
    println!("  URLs visited: {}", report.urls_visited);
    println!("  Pages indexed: {}", report.pages_indexed);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Storage failures: {}", report.storage_failures);
    println!("  Pages discarded: {}", report.pages_discarded);
    if report.cap_reached {
        println!(
            "\n  Stopped at the cap of {} indexed pages",
            config.crawler.max_indexed_pages
        );
    }

    Ok(())
}

/// Handles `rank`: recomputes PageRank
async fn handle_rank(config: &Config, iterations: Option<u32>) -> anyhow::Result<()> {
    let iterations = iterations.unwrap_or(config.ranking.iterations);
    let engine = PageRankEngine::new(open_store(config)?);

    let report = tokio::task::spawn_blocking(move || engine.rank(iterations)).await??;

    println!(
        "Ranked {} URLs over {} links in {} iterations (last change {:.6})",
        report.urls, report.links, report.iterations, report.last_delta
    );
    Ok(())
}

/// Handles `matches`: prints raw match rows
async fn handle_matches(config: &Config, query: &str) -> anyhow::Result<()> {
    let matcher = QueryMatcher::new(open_store(config)?);
    let owned_query = query.to_string();
    let rows = tokio::task::spawn_blocking(move || matcher.match_rows(&owned_query)).await??;

    if rows.is_empty() {
        println!("No matches for {:?}", query);
        return Ok(());
    }

    println!("{:>8}  {:>9}  {:>9}", "url_id", "location0", "location1");
    for row in &rows {
        println!(
            "{:>8}  {:>9}  {:>9}",
            row.url_id, row.location0, row.location1
        );
    }
    println!("\n{} rows", rows.len());
    Ok(())
}

/// Handles `search`: prints ranked URLs
async fn handle_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let matcher = QueryMatcher::new(open_store(config)?);
    let owned_query = query.to_string();
    let ranked = tokio::task::spawn_blocking(move || matcher.ranked(&owned_query)).await??;

    if ranked.is_empty() {
        println!("No results for {:?}", query);
        return Ok(());
    }

    for (position, result) in ranked.iter().enumerate() {
        println!("{:>3}. {:.4}  {}", position + 1, result.score, result.url);
    }
    Ok(())
}

/// Handles `highlight`: writes highlighted documents
async fn handle_highlight(config: &Config, query: &str) -> anyhow::Result<()> {
    let highlighter = Highlighter::new(
        QueryMatcher::new(open_store(config)?),
        build_fetcher(config)?,
        &config.highlight.output_dir,
    );

    let report = highlighter.highlight(query).await?;

    for path in &report.written {
        println!("Wrote {}", path.display());
    }
    for url in &report.skipped {
        println!("Skipped {} (fetch failed)", url);
    }
    if report.written.is_empty() && report.skipped.is_empty() {
        println!("No results for {:?}", query);
    }
    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_store(config)?;
    let report = load_report(store.as_ref())?;
    print_statistics(&report);

    Ok(())
}

/// Handles `body`: fetches one page and prints its text
async fn handle_body(config: &Config, url: &str) -> anyhow::Result<()> {
    let page = build_fetcher(config)?.fetch(url).await?;
    println!("{}", page.content.text);
    Ok(())
}

/// Handles `links`: fetches one page and prints its anchors
async fn handle_links(config: &Config, url: &str) -> anyhow::Result<()> {
    let page = build_fetcher(config)?.fetch(url).await?;
    for anchor in &page.content.anchors {
        if anchor.text.is_empty() {
            println!("{}", anchor.url);
        } else {
            println!("{}  [{}]", anchor.url, anchor.text);
        }
    }
    Ok(())
}

use serde::Deserialize;

/// Main configuration structure for Ripple-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of fetch rounds run from the seed frontier
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Global cap on successfully indexed pages per crawl
    #[serde(rename = "max-indexed-pages", default = "default_max_indexed_pages")]
    pub max_indexed_pages: usize,

    /// Maximum number of anchors taken from a single page
    #[serde(rename = "max-links-per-page", default = "default_max_links_per_page")]
    pub max_links_per_page: usize,

    /// Maximum number of page fetches in flight at once
    #[serde(
        rename = "max-concurrent-fetches",
        default = "default_max_concurrent_fetches"
    )]
    pub max_concurrent_fetches: usize,

    /// Transport timeout for a single fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Seed URLs used when none are given on the command line
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_indexed_pages: default_max_indexed_pages(),
            max_links_per_page: default_max_links_per_page(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            seeds: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Index storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Number of pooled SQLite connections
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,
}

/// PageRank configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Default number of power-iteration rounds
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
        }
    }
}

/// Highlighter output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    /// Directory receiving highlighted documents
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_indexed_pages() -> usize {
    50
}

fn default_max_links_per_page() -> usize {
    100
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_pool_size() -> usize {
    4
}

fn default_iterations() -> u32 {
    5
}

fn default_output_dir() -> String {
    "./highlighted".to_string()
}

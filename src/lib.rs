//! Ripple-Search: a small crawl-index-rank-search engine
//!
//! This crate crawls a web graph level by level, builds a persistent inverted
//! index and link graph in SQLite, ranks pages with PageRank and answers
//! two-term proximity queries ranked by co-occurrence frequency.

pub mod config;
pub mod crawler;
pub mod output;
pub mod ranking;
pub mod search;
pub mod storage;
pub mod text;

use thiserror::Error;

/// Main error type for Ripple-Search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Ripple-Search operations
pub type Result<T> = std::result::Result<T, SearchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler};
pub use ranking::{PageRankEngine, PageRankReport};
pub use search::{MatchRow, QueryMatcher, RankedUrl};
pub use storage::{IndexStore, SqliteIndexStore};

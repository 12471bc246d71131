//! Configuration module for Ripple-Search
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use ripple_search::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripple.toml")).unwrap();
//! println!("Crawler will run {} levels", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HighlightConfig, RankingConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate_seed;

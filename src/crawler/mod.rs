//! Crawler module for web page fetching and indexing
//!
//! This module contains the crawl pipeline, including:
//! - HTTP fetching with a bounded timeout
//! - HTML parsing into body text and anchors
//! - Writing pages into the index
//! - Level-synchronous crawl coordination

mod coordinator;
mod fetcher;
mod indexer;
mod parser;
mod scheduler;

pub use coordinator::{CrawlReport, Crawler};
pub use fetcher::{build_http_client, FetchError, Fetcher, Page};
pub use indexer::index_page;
pub use parser::{parse_html, Anchor, ParsedPage};
pub use scheduler::{CrawlState, Frontier};

//! Storage module for the search index
//!
//! This module owns all persisted state:
//! - domains, urls and words, created lazily through race-safe get-or-create
//! - the link graph and anchor-text words
//! - word locations (the inverted index)
//! - the PageRank score table

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteIndexStore;
pub use traits::{IndexStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (or creates) an index database with a pool of `pool_size` connections
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `pool_size` - Number of connections shared by concurrent callers
pub fn open_index_store(path: &Path, pool_size: usize) -> StorageResult<SqliteIndexStore> {
    SqliteIndexStore::open(path, pool_size)
}

/// Everything one fetched page contributes to the index
///
/// Written as a unit by [`IndexStore::write_page`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDocument {
    pub url: String,
    pub domain: String,

    /// Body tokens in document order; a token's location is its index
    pub words: Vec<String>,

    /// Outgoing anchors in document order (may repeat)
    pub links: Vec<OutgoingLink>,
}

/// One anchor of a [`PageDocument`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingLink {
    pub url: String,
    pub domain: String,

    /// Tokens of the anchor text
    pub words: Vec<String>,
}

/// A directed edge of the crawl graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: i64,
    pub from_url: i64,
    pub to_url: i64,
}

/// One occurrence of a word in a page body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WordLocationRecord {
    pub url_id: i64,
    pub location: u32,
}

/// Row counts of every relation in the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStatistics {
    pub domains: u64,
    pub urls: u64,
    pub words: u64,
    pub word_locations: u64,
    pub links: u64,
    pub link_words: u64,
    pub scored_urls: u64,
}

//! Storage traits and error types
//!
//! This module defines the `IndexStore` interface shared by the crawler,
//! the ranking engine and the query matcher, and its error type.

use crate::storage::{IndexStatistics, LinkRecord, PageDocument, WordLocationRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence adapter for the inverted index, link graph and PageRank table
///
/// Implementations are shared by many concurrent crawl tasks, so every method
/// takes `&self` and must be safe to call from several threads at once.
///
/// The `get_or_create_*` methods are idempotent: they return the id of the row
/// holding the unique key, creating it if needed. Callers racing on the same
/// key all receive the same id, exactly one row is created and a
/// duplicate-key conflict is never surfaced.
pub trait IndexStore: Send + Sync {
    // ===== Get-or-create =====

    /// Returns the id of the domain with this host name
    fn get_or_create_domain(&self, name: &str) -> StorageResult<i64>;

    /// Returns the id of the url with this exact text
    ///
    /// `domain_id` is only used when the row has to be created.
    fn get_or_create_url(&self, url: &str, domain_id: i64) -> StorageResult<i64>;

    /// Returns the id of the word, lowercasing it first
    ///
    /// New words are flagged as ignored when they are prepositions.
    fn get_or_create_word(&self, word: &str) -> StorageResult<i64>;

    /// Returns the id of the directed link between two urls
    fn get_or_create_link(&self, from_url: i64, to_url: i64) -> StorageResult<i64>;

    // ===== Occurrences =====

    /// Records that `word_id` occurs at token `location` of the url's body
    fn append_word_location(&self, url_id: i64, word_id: i64, location: u32)
        -> StorageResult<()>;

    /// Records that `word_id` occurs in the anchor text of a link
    fn append_link_word(&self, link_id: i64, word_id: i64) -> StorageResult<()>;

    // ===== Pages =====

    /// Writes a whole page: its url, body word locations, outgoing links and
    /// their anchor words
    ///
    /// The page lands completely or not at all. Returns the page's url id.
    fn write_page(&self, page: &PageDocument) -> StorageResult<i64>;

    // ===== Link graph =====

    /// Returns every url id, ascending
    fn all_urls(&self) -> StorageResult<Vec<i64>>;

    /// Gets all links leaving a url
    fn outgoing_links(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>>;

    /// Gets all links pointing at a url
    fn incoming_links(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>>;

    /// Counts the links leaving a url
    fn out_degree(&self, url_id: i64) -> StorageResult<u64>;

    // ===== Lookups =====

    /// Returns every (url, location) pair at which a word occurs in page bodies
    fn word_locations_for(&self, word_id: i64) -> StorageResult<Vec<WordLocationRecord>>;

    /// Resolves a url id to its text
    fn url_text(&self, url_id: i64) -> StorageResult<Option<String>>;

    /// Resolves a url text to its id
    fn url_id(&self, url: &str) -> StorageResult<Option<i64>>;

    /// Resolves a word to its id without creating it
    fn word_id(&self, word: &str) -> StorageResult<Option<i64>>;

    // ===== PageRank =====

    /// Drops the score table and rebuilds it with one row per url, all at 1.0
    fn reset_page_rank(&self) -> StorageResult<()>;

    /// Writes the score of one url
    fn write_score(&self, url_id: i64, score: f64) -> StorageResult<()>;

    /// Writes a batch of scores
    fn write_scores(&self, scores: &[(i64, f64)]) -> StorageResult<()> {
        for &(url_id, score) in scores {
            self.write_score(url_id, score)?;
        }
        Ok(())
    }

    /// Reads the score of one url
    fn page_rank(&self, url_id: i64) -> StorageResult<Option<f64>>;

    /// Returns the highest scored urls as (url text, score), best first
    fn top_page_ranks(&self, limit: usize) -> StorageResult<Vec<(String, f64)>>;

    // ===== Statistics =====

    /// Counts the rows of every relation
    fn statistics(&self) -> StorageResult<IndexStatistics>;
}

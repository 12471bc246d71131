//! Query matching and ranking
//!
//! Queries are bigram proximity queries: only the first two distinct terms
//! matter, and a url matches when both occur in its body.

mod matcher;
pub mod scoring;

pub use matcher::QueryMatcher;
pub use scoring::normalize_scores;

/// Maximum number of urls returned by a ranked query
pub const TOP_RESULTS: usize = 50;

/// One co-occurrence of the two query terms on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRow {
    pub url_id: i64,
    /// Token location of the first term
    pub location0: u32,
    /// Token location of the second term
    pub location1: u32,
}

/// A url and its normalized score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedUrl {
    pub url: String,
    pub score: f64,
}

//! Two-term proximity matching over the inverted index

use crate::search::scoring::{match_counts, normalize_scores, top_scores};
use crate::search::{MatchRow, RankedUrl, TOP_RESULTS};
use crate::storage::{IndexStore, StorageResult, WordLocationRecord};
use crate::text::query_terms;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers two-term queries from an `IndexStore`
///
/// Read-only; safe to use while a crawl or ranking run is writing.
#[derive(Clone)]
pub struct QueryMatcher {
    store: Arc<dyn IndexStore>,
}

impl QueryMatcher {
    /// Creates a matcher over the given store
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Finds every co-occurrence of the first two distinct query terms
    ///
    /// For each url containing both terms, every pair of
    /// (location of term 0, location of term 1) is returned. Rows are ordered
    /// by url id, then by the two locations.
    ///
    /// # Returns
    ///
    /// An empty list when the query has fewer than two distinct terms or
    /// either term was never indexed.
    pub fn match_rows(&self, query: &str) -> StorageResult<Vec<MatchRow>> {
        let terms = query_terms(query);
        if terms.len() < 2 {
            tracing::debug!("Query {:?} has fewer than two distinct terms", query);
            return Ok(Vec::new());
        }

        let (Some(word0), Some(word1)) = (
            self.store.word_id(&terms[0])?,
            self.store.word_id(&terms[1])?,
        ) else {
            tracing::debug!("Query {:?} uses a word that was never indexed", query);
            return Ok(Vec::new());
        };

        let first = group_by_url(self.store.word_locations_for(word0)?);
        let second = group_by_url(self.store.word_locations_for(word1)?);

        let mut rows = Vec::new();
        for (url_id, locations0) in &first {
            let Some(locations1) = second.get(url_id) else {
                continue;
            };
            for &location0 in locations0 {
                for &location1 in locations1 {
                    rows.push(MatchRow {
                        url_id: *url_id,
                        location0,
                        location1,
                    });
                }
            }
        }

        Ok(rows)
    }

    /// Ranks urls by how often the two query terms co-occur on them
    ///
    /// Counts are min-max normalized across the candidates; the best
    /// [`TOP_RESULTS`] urls are returned, best first.
    pub fn ranked(&self, query: &str) -> StorageResult<Vec<RankedUrl>> {
        let rows = self.match_rows(query)?;
        let scores = normalize_scores(&match_counts(&rows));

        let mut ranked = Vec::new();
        for (url_id, score) in top_scores(&scores, TOP_RESULTS) {
            match self.store.url_text(url_id)? {
                Some(url) => ranked.push(RankedUrl { url, score }),
                None => tracing::warn!("Matched url {} has no text", url_id),
            }
        }

        tracing::debug!("Query {:?}: {} ranked urls", query, ranked.len());
        Ok(ranked)
    }
}

/// Groups occurrences by url, keeping locations in ascending order
fn group_by_url(records: Vec<WordLocationRecord>) -> BTreeMap<i64, Vec<u32>> {
    let mut grouped: BTreeMap<i64, Vec<u32>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.url_id).or_default().push(record.location);
    }
    for locations in grouped.values_mut() {
        locations.sort_unstable();
    }
    grouped
}

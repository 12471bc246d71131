//! Index statistics report
//!
//! This module renders the row counts of the index and, once PageRank has
//! run, the best scored urls.

use crate::storage::{IndexStatistics, IndexStore};
use std::fmt::Write;

/// Number of top ranked urls shown in the report
const TOP_RANKED: usize = 10;

/// Everything shown by the `stats` command
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub statistics: IndexStatistics,
    pub top_ranked: Vec<(String, f64)>,
}

/// Loads the report from storage
///
/// # Arguments
///
/// * `store` - The index to query
pub fn load_report(store: &dyn IndexStore) -> crate::Result<IndexReport> {
    Ok(IndexReport {
        statistics: store.statistics()?,
        top_ranked: store.top_page_ranks(TOP_RANKED)?,
    })
}

/// Formats the report as plain text
pub fn format_report(report: &IndexReport) -> String {
    let stats = &report.statistics;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Index Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Domains: {}", stats.domains);
    let _ = writeln!(out, "  URLs: {}", stats.urls);
    let _ = writeln!(out, "  Words: {}", stats.words);
    let _ = writeln!(out, "  Word locations: {}", stats.word_locations);
    let _ = writeln!(out, "  Links: {}", stats.links);
    let _ = writeln!(out, "  Link words: {}", stats.link_words);
    let _ = writeln!(out, "  Scored URLs: {}", stats.scored_urls);

    if stats.urls > 0 {
        let _ = writeln!(
            out,
            "\n  Average links per URL: {:.2}",
            stats.links as f64 / stats.urls as f64
        );
    }

    if !report.top_ranked.is_empty() {
        let _ = writeln!(out, "\nTop PageRank ({}):", report.top_ranked.len());
        for (url, score) in &report.top_ranked {
            let _ = writeln!(out, "  {:>10.6}  {}", score, url);
        }
    }

    out
}

/// Prints the report to stdout
pub fn print_statistics(report: &IndexReport) {
    print!("{}", format_report(report));
}

//! Output module for reports and generated documents
//!
//! This module handles:
//! - Printing index statistics and top PageRank scores
//! - Writing highlighted copies of search results

pub mod highlight;
pub mod stats;

pub use highlight::{document_key, render_highlighted, HighlightReport, Highlighter};
pub use stats::{format_report, load_report, print_statistics, IndexReport};

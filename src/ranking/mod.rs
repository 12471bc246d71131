//! Link-analysis ranking
//!
//! PageRank is recomputed in full on every run; there is no incremental update.

mod pagerank;

pub use pagerank::{PageRankEngine, PageRankReport, DAMPING};

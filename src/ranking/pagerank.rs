//! PageRank over the crawled link graph
//!
//! Scores are computed with Jacobi iteration: every round reads only the
//! previous round's scores, so the result does not depend on the order in
//! which urls are visited.

use crate::storage::{IndexStore, StorageResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Damping factor
pub const DAMPING: f64 = 0.85;

/// Summary of one ranking run
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankReport {
    /// Urls scored
    pub urls: usize,

    /// Edges of the graph snapshot the scores were computed from
    pub links: usize,

    /// Rounds performed
    pub iterations: u32,

    /// Largest absolute score change in the final round (0 when no round ran)
    pub last_delta: f64,
}

/// In-memory snapshot of the link graph, indexed by position in `urls`
#[derive(Debug, Default)]
struct LinkGraph {
    /// Url ids, ascending
    urls: Vec<i64>,
    /// For every url, the positions of the urls linking to it, ascending
    incoming: Vec<Vec<usize>>,
    /// Out-degree of every url as reported by the store
    out_degree: Vec<u64>,
}

impl LinkGraph {
    fn load(store: &dyn IndexStore) -> StorageResult<Self> {
        let urls = store.all_urls()?;
        let positions: HashMap<i64, usize> =
            urls.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut out_degree = Vec::with_capacity(urls.len());
        for &url in &urls {
            out_degree.push(store.out_degree(url)?);
        }

        let mut incoming = Vec::with_capacity(urls.len());
        for &url in &urls {
            // Edges from urls created after the snapshot are left out
            let mut sources: Vec<usize> = store
                .incoming_links(url)?
                .iter()
                .filter_map(|link| positions.get(&link.from_url).copied())
                .collect();
            sources.sort_unstable();
            sources.dedup();
            incoming.push(sources);
        }

        Ok(Self {
            urls,
            incoming,
            out_degree,
        })
    }

    fn link_count(&self) -> usize {
        self.incoming.iter().map(Vec::len).sum()
    }

    /// One Jacobi round
    fn step(&self, scores: &[f64]) -> Vec<f64> {
        self.incoming
            .iter()
            .map(|sources| {
                let inflow: f64 = sources
                    .iter()
                    .filter(|&&v| self.out_degree[v] > 0)
                    .map(|&v| scores[v] / self.out_degree[v] as f64)
                    .sum();
                (1.0 - DAMPING) + DAMPING * inflow
            })
            .collect()
    }

    /// Runs `iterations` rounds from all-ones, returning scores and the final delta
    fn iterate(&self, iterations: u32) -> (Vec<f64>, f64) {
        let mut scores = vec![1.0; self.urls.len()];
        let mut last_delta = 0.0;

        for round in 1..=iterations {
            let next = self.step(&scores);
            last_delta = scores
                .iter()
                .zip(&next)
                .map(|(old, new)| (new - old).abs())
                .fold(0.0, f64::max);
            scores = next;

            tracing::debug!("PageRank round {}: max delta {:.6}", round, last_delta);
        }

        (scores, last_delta)
    }
}

/// Computes PageRank scores and stores them in the index
pub struct PageRankEngine {
    store: Arc<dyn IndexStore>,
}

impl PageRankEngine {
    /// Creates an engine over the given store
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Recomputes every score from scratch
    ///
    /// # Steps
    ///
    /// 1. Reset the score table to one row per url, all 1.0
    /// 2. Read one snapshot of the link graph
    /// 3. Run `iterations` Jacobi rounds of
    ///    `score(u) = (1 - d) + d * Σ score(v) / out_degree(v)` over links `v → u`
    /// 4. Write all final scores in one batch
    ///
    /// Urls without outgoing links pass nothing on. Links written by a
    /// concurrent crawl may or may not be part of the snapshot.
    ///
    /// # Arguments
    ///
    /// * `iterations` - Number of rounds
    ///
    /// # Returns
    ///
    /// * `Ok(PageRankReport)` - Scores were written
    /// * `Err(StorageError)` - A read or write failed
    pub fn rank(&self, iterations: u32) -> StorageResult<PageRankReport> {
        self.store.reset_page_rank()?;

        let graph = LinkGraph::load(self.store.as_ref())?;
        tracing::info!(
            "Ranking {} urls over {} links for {} iterations",
            graph.urls.len(),
            graph.link_count(),
            iterations
        );

        let (scores, last_delta) = graph.iterate(iterations);
        let batch: Vec<(i64, f64)> = graph.urls.iter().copied().zip(scores).collect();
        self.store.write_scores(&batch)?;

        tracing::info!("PageRank done, last round changed scores by at most {:.6}", last_delta);

        Ok(PageRankReport {
            urls: graph.urls.len(),
            links: graph.link_count(),
            iterations,
            last_delta,
        })
    }
}

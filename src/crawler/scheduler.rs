//! Per-crawl bookkeeping
//!
//! This module handles:
//! - The visited set of exact URL strings, shared by all tasks of a crawl
//! - The indexed-page counter and the global cap on it
//! - The frontier of URLs for the next level

use dashmap::DashSet;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// State shared by every task of one crawl invocation
///
/// Nothing here outlives the call to `Crawler::crawl`; two crawls never
/// share a visited set or a page count.
#[derive(Debug)]
pub struct CrawlState {
    visited: DashSet<String>,
    indexed: AtomicUsize,
    max_pages: usize,
}

impl CrawlState {
    /// Creates an empty state with a cap of `max_pages` indexed pages
    pub fn new(max_pages: usize) -> Self {
        Self {
            visited: DashSet::new(),
            indexed: AtomicUsize::new(0),
            max_pages,
        }
    }

    /// Marks a URL as visited
    ///
    /// # Returns
    ///
    /// `true` if this call was the first to see the URL
    pub fn mark_visited(&self, url: &str) -> bool {
        if self.visited.contains(url) {
            return false;
        }
        self.visited.insert(url.to_string())
    }

    /// Number of distinct URLs handed to a task so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Returns true once the indexed-page cap is reached
    ///
    /// Tasks poll this before starting new work.
    pub fn cap_reached(&self) -> bool {
        self.indexed.load(Ordering::Acquire) >= self.max_pages
    }

    /// Claims one indexing slot below the cap
    ///
    /// # Returns
    ///
    /// `false` if the cap was already reached; the caller must discard its page
    pub fn try_reserve_slot(&self) -> bool {
        self.indexed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < self.max_pages).then_some(count + 1)
            })
            .is_ok()
    }

    /// Gives back a slot whose page failed to index
    pub fn release_slot(&self) {
        // Only called after a successful reserve, so the count is positive
        self.indexed.fetch_sub(1, Ordering::AcqRel);
    }
}

/// URLs scheduled for one crawl level, in first-seen order without repeats
#[derive(Debug, Default, Clone)]
pub struct Frontier {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL unless it is already present
    pub fn push(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }

    /// Number of distinct URLs
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if no URL is scheduled
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Consumes the frontier, yielding its URLs in insertion order
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

impl FromIterator<String> for Frontier {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut frontier = Frontier::new();
        for url in iter {
            frontier.push(url);
        }
        frontier
    }
}

impl Extend<String> for Frontier {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for url in iter {
            self.push(url);
        }
    }
}

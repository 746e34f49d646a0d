//! Crawl frontier
//!
//! A FIFO queue of fetch targets plus the set of URLs ever enqueued, so a URL
//! is fetched at most once per crawl.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched, with its distance from the seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    /// The URL to fetch
    pub url: Url,

    /// Link distance from the seed; the seed is depth 0
    pub depth: u32,
}

impl FetchTarget {
    /// Creates the seed target at depth 0
    pub fn seed(url: Url) -> Self {
        Self { url, depth: 0 }
    }

    /// Creates a target one level below this one
    pub fn child(&self, url: Url) -> Self {
        Self {
            url,
            depth: self.depth + 1,
        }
    }
}

/// Returns true when a target at `depth` may be fetched under `max_depth`
///
/// `max_depth` counts fetch levels with the seed as level 1, so a limit of 1
/// admits only the seed. A limit of 0 is unlimited.
pub fn within_depth(depth: u32, max_depth: u32) -> bool {
    max_depth == 0 || depth < max_depth
}

/// Sequential queue of pending fetch targets
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FetchTarget>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a target unless its URL was enqueued before
    ///
    /// Returns true if the target was added.
    pub fn push(&mut self, target: FetchTarget) -> bool {
        if !self.seen.insert(target.url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(target);
        true
    }

    /// Takes the oldest pending target
    pub fn pop(&mut self) -> Option<FetchTarget> {
        self.queue.pop_front()
    }

    /// Number of pending targets
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs ever enqueued
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

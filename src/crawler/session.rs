//! Per-crawl session state
//!
//! Counters live on the session owned by a coordinator rather than in
//! process-wide globals, so independent crawls never share state.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle state of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// No pending targets
    Idle,
    /// The frontier holds at least one target
    Crawling,
}

/// Cooperative stop signal checked between frontier dequeues
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests that the crawl stop before its next dequeue
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSession {
    /// Targets dequeued, whether or not they were fetched
    pub visits: u64,
    /// Targets fetched successfully
    pub fetched: u64,
    /// Targets discarded because their host is not allowed
    pub skipped: u64,
    /// Targets whose fetch failed
    pub failed: u64,
    /// Fragments committed to the sink
    pub fragments_logged: u64,
    /// Fragments the sink rejected
    pub fragments_failed: u64,
    /// Child targets added by link discovery
    pub children_enqueued: u64,
    watermark: u64,
    started_at: Option<DateTime<Utc>>,
}

impl CrawlSession {
    /// Creates a session that signals once `watermark` visits are reached (0 disables)
    pub fn new(watermark: u64) -> Self {
        Self {
            watermark,
            ..Self::default()
        }
    }

    /// Marks the start of crawling; only the first call has an effect
    pub fn start(&mut self) {
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Counts one dequeued target
    ///
    /// Returns true exactly when this visit reaches the watermark.
    pub fn record_visit(&mut self) -> bool {
        self.visits += 1;
        self.watermark > 0 && self.visits == self.watermark
    }

    /// Snapshot of the counters
    pub fn report(&self) -> CrawlReport {
        CrawlReport {
            visits: self.visits,
            fetched: self.fetched,
            skipped: self.skipped,
            failed: self.failed,
            fragments_logged: self.fragments_logged,
            fragments_failed: self.fragments_failed,
            children_enqueued: self.children_enqueued,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Summary of a finished (or stopped) crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub visits: u64,
    pub fetched: u64,
    pub skipped: u64,
    pub failed: u64,
    pub fragments_logged: u64,
    pub fragments_failed: u64,
    pub children_enqueued: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Wall-clock duration in milliseconds, if the crawl started
    pub fn duration_ms(&self) -> Option<i64> {
        self.started_at
            .map(|start| (self.finished_at - start).num_milliseconds())
    }
}

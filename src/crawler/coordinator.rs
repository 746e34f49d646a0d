//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pieces together:
//! - Managing the frontier queue and the depth bound
//! - Enforcing the domain allow-list
//! - Fetching through the transport
//! - Extracting fragments and forwarding them to the sink
//! - Enqueuing discovered links

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{HttpTransport, Transport};
use crate::crawler::frontier::{within_depth, FetchTarget, Frontier};
use crate::crawler::parser::{parse_page, ContentSelector};
use crate::crawler::session::{CrawlReport, CrawlSession, CrawlState, StopHandle};
use crate::output::{Fragment, SharedSink, SinkError, SinkResult};
use crate::url::{normalize_url, AllowedDomains};
use crate::{HarvestError, Result};
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    transport: Box<dyn Transport>,
    sink: SharedSink,
    allowed: AllowedDomains,
    selectors: Vec<ContentSelector>,
    max_depth: u32,
    follow_links: bool,
    frontier: Frontier,
    session: CrawlSession,
    state: CrawlState,
    stop: StopHandle,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl scope and selectors
    /// * `transport` - Fetch capability
    /// * `sink` - Where fragments are recorded
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to visit a seed
    /// * `Err(HarvestError)` - A selector failed to compile
    pub fn new(
        config: &CrawlerConfig,
        transport: Box<dyn Transport>,
        sink: SharedSink,
    ) -> Result<Self> {
        let selectors = config
            .selectors
            .iter()
            .map(|s| ContentSelector::parse(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            transport,
            sink,
            allowed: AllowedDomains::new(&config.allowed_domains),
            selectors,
            max_depth: config.max_depth,
            follow_links: config.follow_links,
            frontier: Frontier::new(),
            session: CrawlSession::new(config.visit_watermark),
            state: CrawlState::Idle,
            stop: StopHandle::default(),
        })
    }

    /// Creates a coordinator that fetches over HTTP
    pub fn with_http(config: &Config, sink: SharedSink) -> Result<Self> {
        let allowed = AllowedDomains::new(&config.crawler.allowed_domains);
        let transport = HttpTransport::new(&config.http, &allowed)?;
        Self::new(&config.crawler, Box::new(transport), sink)
    }

    /// Returns a handle that stops the crawl before its next dequeue
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Counters for the crawl so far
    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Number of targets waiting to be fetched
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Enqueues a seed URL at depth 0 without running the crawl
    ///
    /// Returns false if the URL was already enqueued during this crawl.
    pub fn enqueue_seed(&mut self, url: &str) -> Result<bool> {
        let url = normalize_url(url)?;
        let added = self.frontier.push(FetchTarget::seed(url));
        if !self.frontier.is_empty() {
            self.state = CrawlState::Crawling;
        }
        Ok(added)
    }

    /// Visits a seed URL and crawls until the frontier is empty
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sumi_harvest::config::Config;
    /// use sumi_harvest::crawler::Coordinator;
    /// use sumi_harvest::output::{open_sink, share};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::default();
    /// let sink = share(open_sink(&config.output)?);
    /// let mut coordinator = Coordinator::with_http(&config, sink)?;
    /// let report = coordinator.visit(&config.crawler.seed_url).await?;
    /// println!("{} fragments", report.fragments_logged);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn visit(&mut self, url: &str) -> Result<CrawlReport> {
        if !self.enqueue_seed(url)? {
            tracing::debug!("Seed {} was already visited", url);
        }
        self.run().await
    }

    /// Drains the frontier
    ///
    /// Fetch failures and failed fragment writes are logged and counted and
    /// the crawl goes on. A sink that can take no more records (closed,
    /// poisoned, or left inconsistent) ends the crawl with an error.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        self.session.start();

        while let Some(target) = self.next_target() {
            if let Err(e) = self.process_target(target).await {
                self.state = CrawlState::Idle;
                tracing::error!(
                    "Sink unusable, aborting crawl with {} URLs queued: {}",
                    self.frontier.len(),
                    e
                );
                return Err(HarvestError::Sink(e));
            }
        }

        self.state = CrawlState::Idle;

        let report = self.session.report();
        tracing::info!(
            "Crawl finished: {} visits, {} fetched, {} skipped, {} failed, {} fragments logged, {} fragments lost",
            report.visits,
            report.fetched,
            report.skipped,
            report.failed,
            report.fragments_logged,
            report.fragments_failed
        );
        Ok(report)
    }

    fn next_target(&mut self) -> Option<FetchTarget> {
        if self.stop.is_stopped() {
            if !self.frontier.is_empty() {
                tracing::info!(
                    "Stop requested, abandoning {} queued URLs",
                    self.frontier.len()
                );
            }
            return None;
        }
        self.frontier.pop()
    }

    /// Processes a single target
    ///
    /// Only fatal sink errors are returned.
    async fn process_target(&mut self, target: FetchTarget) -> SinkResult<()> {
        if self.session.record_visit() {
            tracing::warn!(
                "Reached {} visits (watermark), continuing crawl",
                self.session.visits
            );
        }

        if !self.allowed.allows(&target.url) {
            tracing::debug!("Skipping {}: domain not allowed", target.url);
            self.session.skipped += 1;
            return Ok(());
        }

        tracing::info!("Visiting {}", target.url);

        let document = match self.transport.fetch(&target.url).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Fetch failed, dropping target: {}", e);
                self.session.failed += 1;
                return Ok(());
            }
        };
        self.session.fetched += 1;

        if !document.is_html() {
            tracing::debug!(
                "Not extracting {}: content type {:?}",
                target.url,
                document.content_type
            );
            return Ok(());
        }

        let collect_links = self.follow_links && within_depth(target.depth + 1, self.max_depth);
        let parsed = parse_page(
            &document.body,
            &document.final_url,
            &self.selectors,
            collect_links,
        );

        tracing::debug!(
            "Extracted {} fragments and {} links from {}",
            parsed.fragments.len(),
            parsed.links.len(),
            target.url
        );

        for fragment in &parsed.fragments {
            self.record_fragment(fragment)?;
        }

        self.enqueue_links(&target, parsed.links);
        Ok(())
    }

    /// Appends one fragment, holding the sink lock for the whole write
    ///
    /// A failed write is counted and swallowed; fatal sink errors are returned.
    fn record_fragment(&mut self, fragment: &Fragment) -> SinkResult<()> {
        let result = match self.sink.lock() {
            Ok(mut sink) => sink.append(fragment),
            Err(e) => Err(SinkError::Poisoned(e.to_string())),
        };

        match result {
            Ok(()) => self.session.fragments_logged += 1,
            Err(e) if e.is_fatal() => {
                self.session.fragments_failed += 1;
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Failed to log fragment '{}': {}", fragment.key, e);
                self.session.fragments_failed += 1;
            }
        }
        Ok(())
    }

    /// Enqueues discovered links one level below `parent`
    fn enqueue_links(&mut self, parent: &FetchTarget, links: Vec<Url>) {
        for link in links {
            let child = parent.child(link);
            if !within_depth(child.depth, self.max_depth) {
                continue;
            }
            if self.frontier.push(child) {
                self.session.children_enqueued += 1;
            }
        }
    }
}

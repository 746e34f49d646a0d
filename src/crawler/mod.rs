//! Crawler module for page fetching and fragment harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Transport` trait
//! - HTML parsing, fragment extraction, and link extraction
//! - The frontier queue and depth bound
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod session;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, Document, FetchError, HttpTransport, Transport, MAX_REDIRECTS};
pub use frontier::{within_depth, FetchTarget, Frontier};
pub use parser::{extract_fragments, parse_page, ContentSelector, ParsedPage};
pub use session::{CrawlReport, CrawlSession, CrawlState, StopHandle};

use crate::config::Config;
use crate::output::SharedSink;
use crate::Result;

/// Runs a complete crawl from the configured seed
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the HTTP transport
/// 2. Visit the seed URL
/// 3. Extract fragments from every fetched page and append them to `sink`
/// 4. Follow links while the depth bound permits
///
/// The sink is left open; closing it is the caller's job.
pub async fn harvest(config: &Config, sink: SharedSink) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::with_http(config, sink)?;
    coordinator.visit(&config.crawler.seed_url).await
}

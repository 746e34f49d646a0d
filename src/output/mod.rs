//! Output module for recording harvested fragments
//!
//! This module handles:
//! - The fragment record type and sink error taxonomy
//! - The `FragmentSink` trait the crawler writes through
//! - `DualSink`, which mirrors every fragment into CSV and JSON Lines files

mod sink;
mod traits;

pub use sink::{DualSink, RecordStream, SinkOptions};
pub use traits::{Fragment, FragmentSink, SinkError, SinkResult, StreamKind};

use crate::config::OutputConfig;
use std::sync::{Arc, Mutex};

/// A sink shared between the crawler and its owner
///
/// The mutex is held for the whole two-stream write of a fragment, so
/// concurrent producers can never interleave their records.
pub type SharedSink = Arc<Mutex<dyn FragmentSink + Send>>;

/// Opens the dual sink described by the output configuration
pub fn open_sink(config: &OutputConfig) -> SinkResult<DualSink> {
    DualSink::open(
        &config.csv_path,
        &config.jsonl_path,
        SinkOptions {
            csv_header: config.csv_header,
            sync_each_record: config.sync_each_record,
        },
    )
}

/// Wraps a sink for sharing with a crawler
pub fn share<S: FragmentSink + Send + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Closes a shared sink
pub fn close_shared(sink: &SharedSink) -> SinkResult<()> {
    let mut guard = sink
        .lock()
        .map_err(|e| SinkError::Poisoned(e.to_string()))?;
    guard.close()
}

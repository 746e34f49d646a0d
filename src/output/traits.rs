//! Output sink traits and types
//!
//! This module defines the record type written by sinks, the sink trait the
//! crawler drives, and the sink error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Identifies one of the two output streams of a dual sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Row-oriented CSV stream
    Csv,
    /// Line-delimited JSON stream
    Jsonl,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Csv => write!(f, "csv"),
            StreamKind::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Errors that can occur during sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create output {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write fragment '{key}' to {stream} stream: {source}")]
    WriteFailed {
        key: String,
        stream: StreamKind,
        source: std::io::Error,
    },

    #[error("Failed to close {stream} stream: {source}")]
    CloseFailed {
        stream: StreamKind,
        source: std::io::Error,
    },

    #[error("Sink is closed")]
    SinkClosed,

    #[error("Sink lock poisoned: {0}")]
    Poisoned(String),

    #[error("{stream} stream holds a partial record that could not be rolled back")]
    Inconsistent { stream: StreamKind },
}

impl SinkError {
    /// Returns true if the sink can accept no further records
    ///
    /// A failed write loses one fragment; every other append error means
    /// the sink itself is unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SinkError::WriteFailed { .. } | SinkError::CloseFailed { .. }
        )
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// One extracted unit of content
///
/// `key` names where the text came from (the selector), `value` is the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub key: String,
    pub value: String,
}

impl Fragment {
    /// Creates a new fragment
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Trait for fragment sinks
///
/// A sink durably records fragments in the order they are appended. Callers
/// sharing a sink must serialize `append` calls; the crawler does this by
/// holding sinks behind a mutex.
pub trait FragmentSink {
    /// Records a single fragment
    ///
    /// Returns only after the fragment is committed, or with the error that
    /// stopped it. Implementations must not retry or drop records silently.
    fn append(&mut self, fragment: &Fragment) -> SinkResult<()>;

    /// Flushes and releases the underlying outputs
    ///
    /// After `close`, every `append` fails with [`SinkError::SinkClosed`].
    fn close(&mut self) -> SinkResult<()>;

    /// Returns true once the sink has been closed
    fn is_closed(&self) -> bool;
}

//! Dual-format fragment sink
//!
//! Every fragment is written as a CSV row and as a JSON Lines record. The CSV
//! row is committed before the JSON line is issued, so the CSV stream never
//! trails the JSONL stream.
//!
//! Each record is encoded in memory and written with a single `write_all`.
//! When a write fails, the stream is truncated back to its last committed
//! length, so a failed record leaves no partial row or unterminated line
//! behind. A failed JSON line also rolls back the CSV row of the same record.
//! If a stream cannot be truncated the sink refuses further appends with
//! [`SinkError::Inconsistent`].

use crate::output::traits::{Fragment, FragmentSink, SinkError, SinkResult, StreamKind};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Options applied when opening a [`DualSink`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkOptions {
    /// Write a `key,value` header row to the CSV file on open
    pub csv_header: bool,

    /// fsync the CSV file after every record instead of only flushing it
    pub sync_each_record: bool,
}

/// A seekable output that can be cut back to a committed length
pub trait RecordStream: Write + Seek {
    /// Truncates the stream to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Forces written data to stable storage
    fn sync_data(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RecordStream for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// One output stream and the length of its committed records
struct Committed<S> {
    stream: S,
    len: u64,
}

/// Outcome of a failed write after the rollback attempt
struct WriteFailure {
    source: io::Error,
    rolled_back: bool,
}

impl<S: RecordStream> Committed<S> {
    fn new(stream: S) -> Self {
        Self { stream, len: 0 }
    }

    /// Writes `bytes` as one record, truncating back to the committed length on failure
    fn write_record(&mut self, bytes: &[u8], sync: bool) -> Result<(), WriteFailure> {
        let written = self
            .stream
            .write_all(bytes)
            .and_then(|()| self.stream.flush())
            .and_then(|()| if sync { self.stream.sync_data() } else { Ok(()) });

        match written {
            Ok(()) => {
                self.len += bytes.len() as u64;
                Ok(())
            }
            Err(source) => Err(WriteFailure {
                source,
                rolled_back: self.rewind(self.len).is_ok(),
            }),
        }
    }

    /// Cuts the stream back to `len` bytes and moves the cursor there
    fn rewind(&mut self, len: u64) -> io::Result<()> {
        if self.stream.stream_position()? != len {
            self.stream.truncate(len)?;
            self.stream.seek(SeekFrom::Start(len))?;
        }
        self.len = len;
        Ok(())
    }
}

/// Encodes one CSV row with RFC 4180 quoting
fn encode_csv_row(fields: [&str; 2]) -> io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields).map_err(io::Error::from)?;
    writer.into_inner().map_err(|e| e.into_error())
}

/// Encodes one JSON Lines record
fn encode_json_line(fragment: &Fragment) -> io::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(fragment).map_err(io::Error::from)?;
    line.push(b'\n');
    Ok(line)
}

/// Sink that mirrors fragments into a CSV file and a JSON Lines file
pub struct DualSink<C = File, J = File> {
    csv: Option<Committed<C>>,
    jsonl: Option<Committed<J>>,
    sync_each_record: bool,
    inconsistent: Option<StreamKind>,
    records: u64,
}

impl DualSink {
    /// Creates both output files, truncating existing ones
    ///
    /// If the JSONL file cannot be created the already opened CSV handle is
    /// released before the error is returned; no partially open sink escapes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sumi_harvest::output::{DualSink, Fragment, FragmentSink, SinkOptions};
    ///
    /// let mut sink = DualSink::open("scrape.csv", "scrape.jsonl", SinkOptions::default())?;
    /// sink.append(&Fragment::new("p", "Hello"))?;
    /// sink.close()?;
    /// # Ok::<(), sumi_harvest::output::SinkError>(())
    /// ```
    pub fn open(
        csv_path: impl AsRef<Path>,
        jsonl_path: impl AsRef<Path>,
        options: SinkOptions,
    ) -> SinkResult<Self> {
        let csv_path = csv_path.as_ref();
        let jsonl_path = jsonl_path.as_ref();

        let csv_file = File::create(csv_path).map_err(|source| create_failed(csv_path, source))?;

        // On failure `csv_file` is dropped here, closing the handle.
        let jsonl_file =
            File::create(jsonl_path).map_err(|source| create_failed(jsonl_path, source))?;

        let sink = Self::from_streams(csv_file, jsonl_file, options)
            .map_err(|source| create_failed(csv_path, source))?;

        tracing::debug!(
            "Opened sink: csv={}, jsonl={}",
            csv_path.display(),
            jsonl_path.display()
        );
        Ok(sink)
    }
}

fn create_failed(path: &Path, source: io::Error) -> SinkError {
    SinkError::CreateFailed {
        path: PathBuf::from(path),
        source,
    }
}

fn write_failed(fragment: &Fragment, stream: StreamKind, source: io::Error) -> SinkError {
    SinkError::WriteFailed {
        key: fragment.key.clone(),
        stream,
        source,
    }
}

impl<C: RecordStream, J: RecordStream> DualSink<C, J> {
    /// Builds a sink over two already open, empty streams
    pub fn from_streams(csv: C, jsonl: J, options: SinkOptions) -> io::Result<Self> {
        let mut csv = Committed::new(csv);
        if options.csv_header {
            let header = encode_csv_row(["key", "value"])?;
            csv.write_record(&header, options.sync_each_record)
                .map_err(|failure| failure.source)?;
        }

        Ok(Self {
            csv: Some(csv),
            jsonl: Some(Committed::new(jsonl)),
            sync_each_record: options.sync_each_record,
            inconsistent: None,
            records: 0,
        })
    }

    /// Number of fragments committed to both streams
    pub fn records_written(&self) -> u64 {
        self.records
    }
}

impl<C: RecordStream, J: RecordStream> FragmentSink for DualSink<C, J> {
    fn append(&mut self, fragment: &Fragment) -> SinkResult<()> {
        let (Some(csv), Some(jsonl)) = (self.csv.as_mut(), self.jsonl.as_mut()) else {
            return Err(SinkError::SinkClosed);
        };
        if let Some(stream) = self.inconsistent {
            return Err(SinkError::Inconsistent { stream });
        }

        let row = encode_csv_row([fragment.key.as_str(), fragment.value.as_str()])
            .map_err(|e| write_failed(fragment, StreamKind::Csv, e))?;
        let line =
            encode_json_line(fragment).map_err(|e| write_failed(fragment, StreamKind::Jsonl, e))?;

        let csv_len = csv.len;
        if let Err(failure) = csv.write_record(&row, self.sync_each_record) {
            if !failure.rolled_back {
                self.inconsistent = Some(StreamKind::Csv);
            }
            return Err(write_failed(fragment, StreamKind::Csv, failure.source));
        }

        if let Err(failure) = jsonl.write_record(&line, false) {
            if !failure.rolled_back {
                self.inconsistent = Some(StreamKind::Jsonl);
            } else if let Err(e) = csv.rewind(csv_len) {
                // The CSV keeps the row, one record ahead of the JSONL stream
                tracing::warn!("Could not roll back CSV row for '{}': {}", fragment.key, e);
            }
            return Err(write_failed(fragment, StreamKind::Jsonl, failure.source));
        }

        self.records += 1;
        Ok(())
    }

    fn close(&mut self) -> SinkResult<()> {
        let mut first_error = None;

        if let Some(mut csv) = self.csv.take() {
            let flushed = csv.stream.flush().and_then(|()| {
                if self.sync_each_record {
                    csv.stream.sync_data()
                } else {
                    Ok(())
                }
            });
            if let Err(source) = flushed {
                first_error = Some(SinkError::CloseFailed {
                    stream: StreamKind::Csv,
                    source,
                });
            }
        }

        if let Some(mut jsonl) = self.jsonl.take() {
            if let Err(source) = jsonl.stream.flush() {
                first_error.get_or_insert(SinkError::CloseFailed {
                    stream: StreamKind::Jsonl,
                    source,
                });
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::debug!("Closed sink after {} records", self.records);
                Ok(())
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.csv.is_none() && self.jsonl.is_none()
    }
}

//! CSV file sink
//!
//! Each append renders the whole batch in memory, then opens the file in
//! append mode and writes it with a single call. The header is included
//! when the file is new or empty. Nothing is kept open between batches, and
//! a batch that fails to render never touches the file.

use crate::record::{Record, COLUMNS};
use crate::storage::traits::{Sink, StorageError, StorageResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only CSV sink
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing to `path`
    ///
    /// The file is not touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> StorageResult<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serializes a batch of records, optionally preceded by the header row
fn render_batch(records: &[Record], header: bool) -> StorageResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if header {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

impl Sink for CsvSink {
    fn append(&mut self, records: &[Record]) -> StorageResult<()> {
        let header = self.needs_header()?;
        if header {
            tracing::debug!("Writing header to {}", self.path.display());
        }
        let bytes = render_batch(records, header)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        // Nothing was ever written, so there is nothing to make durable
        if !self.path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new().append(true).open(&self.path)?;
        file.sync_all()?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

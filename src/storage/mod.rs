//! Storage module for persisting harvested records
//!
//! This module contains:
//! - The [`Sink`] trait for append-only tabular destinations
//! - [`CsvSink`], the CSV file implementation
//! - [`DedupBuffer`], the buffered, deduplicating pipeline in front of a sink

mod csv_sink;
mod pipeline;
mod traits;

pub use csv_sink::CsvSink;
pub use pipeline::{AddOutcome, DedupBuffer, PipelineStats};
pub use traits::{Sink, StorageError, StorageResult};

use std::path::{Path, PathBuf};

/// Opens a CSV-backed pipeline for one crawl job
///
/// The parent directory of `path` is created if missing.
///
/// # Arguments
///
/// * `path` - Destination CSV file
/// * `batch_size` - Number of buffered records that triggers a flush
pub fn open_csv_pipeline(path: &Path, batch_size: usize) -> StorageResult<DedupBuffer> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(DedupBuffer::new(Box::new(CsvSink::new(path)), batch_size))
}

/// Output file for a keyword inside the output directory
pub fn output_path(directory: &Path, keyword: &str) -> PathBuf {
    directory.join(format!("{}.csv", crate::url::file_slug(keyword)))
}

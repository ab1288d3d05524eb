//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and the
//! associated error types.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Pipeline lock poisoned")]
    Poisoned,

    #[error("Pipeline is closed")]
    Closed,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only tabular destination for records
///
/// Columns are fixed to [`crate::record::COLUMNS`]. Implementations write a
/// header exactly once, on the first append to a new or empty destination.
pub trait Sink: Send {
    /// Appends a batch of records
    ///
    /// Called only with non-empty batches.
    fn append(&mut self, records: &[Record]) -> StorageResult<()>;

    /// Makes every appended record durable
    fn sync(&mut self) -> StorageResult<()>;

    /// Human-readable destination, used in logs
    fn describe(&self) -> String;
}

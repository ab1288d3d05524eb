//! Buffered, deduplicating record pipeline
//!
//! The pipeline is the only shared mutable resource of a crawl job. Every
//! operation takes the same mutex, so a flush in progress blocks concurrent
//! `add` calls and two flushes can never write the same batch.

use crate::record::Record;
use crate::storage::traits::{Sink, StorageError, StorageResult};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Outcome of submitting a record to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Record was queued for the next flush
    Queued,
    /// Record was queued and triggered an automatic flush
    Flushed,
    /// A record with the same name was already seen in this job
    Duplicate,
}

/// Counters describing what the pipeline did so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records accepted (first of their name)
    pub accepted: usize,
    /// Records dropped as duplicates
    pub duplicates: usize,
    /// Non-empty flushes performed
    pub flushes: usize,
    /// Records written to the sink
    pub written: usize,
}

/// Mutable state guarded by the pipeline mutex
struct PipelineState {
    seen: HashSet<String>,
    queue: VecDeque<Record>,
    sink: Box<dyn Sink>,
    stats: PipelineStats,
    closed: bool,
}

impl PipelineState {
    fn flush(&mut self) -> StorageResult<usize> {
        if self.queue.is_empty() {
            return Ok(0);
        }

        let batch: Vec<Record> = std::mem::take(&mut self.queue).into();
        if let Err(e) = self.sink.append(&batch) {
            // Put the batch back in front of anything queued meanwhile
            let mut restored: VecDeque<Record> = batch.into();
            restored.append(&mut self.queue);
            self.queue = restored;
            return Err(e);
        }

        self.stats.flushes += 1;
        self.stats.written += batch.len();
        tracing::debug!(
            records = batch.len(),
            sink = %self.sink.describe(),
            "Flushed batch"
        );
        Ok(batch.len())
    }
}

/// Deduplicating buffer in front of a [`Sink`]
///
/// Records are keyed by name: the first record of a name wins and later
/// ones are dropped with a warning. Accepted records are buffered and
/// written in batches once `threshold` records are queued, and on
/// [`DedupBuffer::close`].
pub struct DedupBuffer {
    threshold: usize,
    state: Mutex<PipelineState>,
}

impl DedupBuffer {
    /// Creates a pipeline flushing to `sink` every `threshold` records
    ///
    /// A threshold of zero is treated as one.
    pub fn new(sink: Box<dyn Sink>, threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            state: Mutex::new(PipelineState {
                seen: HashSet::new(),
                queue: VecDeque::new(),
                sink,
                stats: PipelineStats::default(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, PipelineState>> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Submits a record
    ///
    /// Duplicates are not an error; they are logged and reported as
    /// [`AddOutcome::Duplicate`]. An error is only returned when an automatic
    /// flush fails or the pipeline was already closed.
    pub fn add(&self, record: Record) -> StorageResult<AddOutcome> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(StorageError::Closed);
        }

        if state.seen.contains(record.key()) {
            state.stats.duplicates += 1;
            tracing::warn!("Duplicate item found: {}. Item dropped.", record.key());
            return Ok(AddOutcome::Duplicate);
        }

        state.seen.insert(record.key().to_string());
        state.queue.push_back(record);
        state.stats.accepted += 1;

        if state.queue.len() >= self.threshold {
            state.flush()?;
            return Ok(AddOutcome::Flushed);
        }

        Ok(AddOutcome::Queued)
    }

    /// Writes every buffered record to the sink
    ///
    /// Returns the number of records written; an empty buffer is a no-op
    /// that never touches the sink.
    pub fn flush(&self) -> StorageResult<usize> {
        self.lock()?.flush()
    }

    /// Flushes what is left, syncs the sink and rejects further records
    ///
    /// Closing twice is harmless.
    pub fn close(&self) -> StorageResult<PipelineStats> {
        let mut state = self.lock()?;
        if !state.closed {
            state.flush()?;
            state.sink.sync()?;
            state.closed = true;
            tracing::debug!(sink = %state.sink.describe(), "Pipeline closed");
        }
        Ok(state.stats)
    }

    /// Discards buffered records without writing them and closes the pipeline
    ///
    /// Batches flushed earlier stay in the sink. Returns the number of
    /// discarded records.
    pub fn abandon(&self) -> StorageResult<usize> {
        let mut state = self.lock()?;
        let discarded = state.queue.len();
        state.queue.clear();
        state.closed = true;
        state.sink.sync()?;
        Ok(discarded)
    }

    /// Number of records waiting for the next flush
    pub fn pending(&self) -> StorageResult<usize> {
        Ok(self.lock()?.queue.len())
    }

    pub fn stats(&self) -> StorageResult<PipelineStats> {
        Ok(self.lock()?.stats)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

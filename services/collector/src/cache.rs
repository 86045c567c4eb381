//! Write-batching cache
//!
//! Accumulates outgoing persistence records and flushes them to the
//! sink as one batch when a size threshold is reached. The append that
//! crosses the threshold performs the flush before returning, so the
//! pending length only exceeds the threshold for the instant between
//! the check and the sink call.
//!
//! Failure policy: a failed sink write retains the batch. The error is
//! propagated to the caller and the same records (plus any appended
//! since) ride along to the next flush attempt. At-least-once, never
//! silent loss.

use tracing::{info, warn};

use crate::record::{RecordSink, SinkWriteError};

/// Size-bounded batch of pending records with an owned sink.
///
/// Generic over the record type. Single-owner by design: the threshold
/// check-and-flush is one atomic decision, so concurrent producers must
/// wrap the cache in their own mutual exclusion.
pub struct BatchCache<R, S> {
    pending: Vec<R>,
    threshold: usize,
    sink: S,
}

impl<R, S> BatchCache<R, S>
where
    R: Send + Sync,
    S: RecordSink<R>,
{
    /// Create a cache that flushes once `threshold` records are
    /// pending. A threshold of 1 degenerates to per-record writes.
    pub fn new(threshold: usize, sink: S) -> Self {
        Self {
            pending: Vec::with_capacity(threshold),
            threshold,
            sink,
        }
    }

    /// Append one record, flushing synchronously if the threshold is
    /// reached. Returns the number of records flushed (0 if no flush
    /// was triggered).
    pub async fn append(&mut self, record: R) -> Result<usize, SinkWriteError> {
        self.pending.push(record);
        if self.pending.len() >= self.threshold {
            self.flush().await
        } else {
            Ok(0)
        }
    }

    /// Flush everything pending, regardless of threshold.
    ///
    /// On failure the pending records are retained for a later retry.
    pub async fn flush(&mut self) -> Result<usize, SinkWriteError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        match self.sink.write_batch(&self.pending).await {
            Ok(()) => {
                let flushed = self.pending.len();
                self.pending.clear();
                info!(flushed, "batch flushed to sink");
                Ok(flushed)
            }
            Err(err) => {
                warn!(
                    pending = self.pending.len(),
                    error = %err,
                    "sink write failed; retaining batch for retry"
                );
                Err(err)
            }
        }
    }

    /// Number of records currently pending.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Configured flush threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

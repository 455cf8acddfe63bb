// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for mutations that could not reach the remote.
//!
//! Uses JSONL format for durability - each operation is written as a single
//! line and fsynced immediately. Replay is strictly FIFO: the first failing
//! entry stops the pass and it, plus everything behind it, stays queued.
//! Entries are removed from disk one at a time as their handler succeeds, so
//! a crash mid-replay never loses or duplicates more than one entry.

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roam_core::{jsonl, Clock, OperationKind, QueuedOperation, SystemClock};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] roam_core::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Outcome of one replay pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport<T> {
    /// Outputs of the handlers that succeeded, in queue order.
    pub outputs: Vec<T>,
    /// Entries still queued after the pass.
    pub remaining: usize,
}

impl<T> DrainReport<T> {
    /// Number of entries replayed and removed.
    pub fn processed(&self) -> usize {
        self.outputs.len()
    }
}

/// Durable FIFO of [`QueuedOperation`]s.
pub struct OfflineQueue {
    /// Path to the queue file.
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl OfflineQueue {
    /// Create or open an offline queue at the given path.
    pub fn open(path: &Path) -> QueueResult<Self> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Like [`OfflineQueue::open`], stamping entries with `clock`.
    pub fn with_clock(path: &Path, clock: Arc<dyn Clock>) -> QueueResult<Self> {
        let queue = OfflineQueue {
            path: path.to_path_buf(),
            clock,
        };
        let dropped = jsonl::repair_tail(path)?;
        if dropped > 0 {
            warn!(
                bytes = dropped,
                path = %path.display(),
                "discarded torn entry at end of offline queue"
            );
        }
        // Fail early on a corrupt file rather than at the first replay.
        let pending = queue.len()?;
        if pending > 0 {
            info!(pending, path = %path.display(), "offline queue has pending operations");
        }
        Ok(queue)
    }

    /// Stamps future entries with `clock`.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enqueue an operation for later replay.
    ///
    /// The operation is stamped with the current time and persisted
    /// before this returns.
    pub fn enqueue(
        &mut self,
        kind: OperationKind,
        data: Value,
        data_type: Option<String>,
    ) -> QueueResult<QueuedOperation> {
        let op = QueuedOperation::new(kind, data, data_type, self.clock.now())?;
        jsonl::append(&self.path, &op)?;
        debug!(kind = %op.kind, data_type = ?op.data_type, "enqueued offline operation");
        Ok(op)
    }

    /// Read all queued operations without removing them.
    pub fn peek_all(&self) -> QueueResult<Vec<QueuedOperation>> {
        Ok(jsonl::read_all(&self.path)?)
    }

    /// Get the number of queued operations.
    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.peek_all()?.len())
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Clear all queued operations.
    pub fn clear(&mut self) -> QueueResult<()> {
        jsonl::rewrite::<QueuedOperation>(&self.path, &[])?;
        Ok(())
    }

    /// Remove the first N operations from the queue.
    pub fn remove_first(&mut self, count: usize) -> QueueResult<()> {
        let ops = self.peek_all()?;
        let remaining = ops.get(count..).unwrap_or_default();
        jsonl::rewrite(&self.path, remaining)?;
        Ok(())
    }

    /// Replays queued operations in order through `handler`.
    ///
    /// Each entry is removed only after its handler returns `Ok`. The first
    /// `Err` ends the pass; that entry and all later ones stay queued for
    /// the next call. Storage errors abort the pass and propagate.
    pub async fn process_queue<F, Fut, T, E>(
        &mut self,
        mut handler: F,
    ) -> QueueResult<DrainReport<T>>
    where
        F: FnMut(QueuedOperation) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let ops = self.peek_all()?;
        let total = ops.len();
        let mut outputs = Vec::new();

        for op in ops {
            let kind = op.kind;
            match handler(op).await {
                Ok(output) => {
                    self.remove_first(1)?;
                    outputs.push(output);
                }
                Err(e) => {
                    warn!(%kind, error = %e, "offline replay stopped");
                    break;
                }
            }
        }

        let report = DrainReport {
            remaining: total - outputs.len(),
            outputs,
        };
        if report.processed() > 0 {
            info!(
                processed = report.processed(),
                remaining = report.remaining,
                "replayed offline queue"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

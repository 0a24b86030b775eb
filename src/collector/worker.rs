//! Background worker loop.
//!
//! Drains the row queue into the buffer and flushes whenever the buffer
//! reaches the flush limit. The loop's only exit is the queue reporting
//! closed-and-empty; there is no separate cancellation signal.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use crate::error_handling::ErrorSink;
use crate::storage::{Buffer, FlushExecutor, Row};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker has been launched yet.
    NotStarted,
    /// Waiting for the next row.
    Idle,
    /// Appending a received row, and flushing if the limit was reached.
    Draining,
    /// Queue closed and exhausted; the loop has returned.
    Terminated,
}

/// Lock-free holder for a [`WorkerState`].
#[derive(Debug)]
pub(crate) struct WorkerStateCell(AtomicU8);

impl WorkerStateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::NotStarted as u8))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> WorkerState {
        match self.0.load(Ordering::Acquire) {
            0 => WorkerState::NotStarted,
            1 => WorkerState::Idle,
            2 => WorkerState::Draining,
            _ => WorkerState::Terminated,
        }
    }
}

/// Everything the worker task owns. Built with the collector and handed to
/// the task by whichever caller wins the start race.
pub(crate) struct Worker {
    pub(crate) rx: mpsc::Receiver<Row>,
    pub(crate) buffer: Arc<Buffer>,
    pub(crate) flusher: Arc<FlushExecutor>,
    pub(crate) flush_limit: usize,
    pub(crate) sink: Arc<dyn ErrorSink>,
    pub(crate) state: Arc<WorkerStateCell>,
    /// Signalled when the loop returns. Dropped without a send if it panics.
    pub(crate) done: oneshot::Sender<()>,
}

impl Worker {
    pub(crate) async fn run(self) {
        let Worker {
            mut rx,
            buffer,
            flusher,
            flush_limit,
            sink,
            state,
            done,
        } = self;
        debug!("Worker for {} started", flusher.table());

        loop {
            state.set(WorkerState::Idle);
            let Some(row) = rx.recv().await else {
                break;
            };

            state.set(WorkerState::Draining);
            if buffer.append(row) >= flush_limit {
                // A failed flush must not stop ingestion
                if let Err(e) = flusher.flush().await {
                    sink.report(flusher.table(), &e);
                }
            }
        }

        state.set(WorkerState::Terminated);
        info!(
            "Worker for {} drained its queue ({} rows left for the final flush)",
            flusher.table(),
            buffer.count()
        );
        let _ = done.send(());
    }
}

//! Row collector: the public ingestion and lifecycle API.
//!
//! A [`Collector`] buffers rows for one destination table and writes them as
//! bulk insert batches:
//!
//! - producers call [`Collector::add`], which enqueues into a bounded queue
//!   and waits when it is full
//! - one background worker drains the queue into a buffer and flushes every
//!   time the buffer reaches the flush limit
//! - [`Collector::stop`] closes the queue, waits for the worker to drain it,
//!   flushes what is left and closes the destination
//!
//! Flush failures during normal operation go to an [`ErrorSink`] and the rows
//! of that batch are dropped. Only the final flush and the destination close
//! report errors to a caller, through `stop`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ch_collector::{row, ClickHouseConfig, ClickHouseDestination, Collector, CollectorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let destination = Arc::new(ClickHouseDestination::new(ClickHouseConfig::default())?);
//! let collector = Collector::new(destination, CollectorConfig::new("events"))?;
//!
//! collector.add(row![1u64, "page_view", chrono::Utc::now()]).await?;
//! collector.stop().await?;
//! # Ok(())
//! # }
//! ```

mod lifecycle;
mod worker;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};

use crate::config::CollectorConfig;
use crate::destination::Destination;
use crate::error_handling::{
    CollectorError, CollectorStats, ErrorSink, LogErrorSink, StatKind, StatsSnapshot,
};
use crate::storage::{Buffer, FlushExecutor, FlushOutcome, Row};

pub use lifecycle::StartGuard;
pub use worker::WorkerState;

use worker::{Worker, WorkerStateCell};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Batching writer for one destination table.
///
/// Share it between producers with `Arc<Collector>`. All methods take `&self`.
pub struct Collector {
    config: CollectorConfig,
    /// `None` once `stop` has begun; taking it closes the queue.
    sender: Mutex<Option<mpsc::Sender<Row>>>,
    /// Parts for the worker task, taken by the caller that wins the start.
    pending_worker: Mutex<Option<Worker>>,
    worker_done: Mutex<Option<oneshot::Receiver<()>>>,
    start_guard: StartGuard,
    worker_state: Arc<WorkerStateCell>,
    buffer: Arc<Buffer>,
    flusher: Arc<FlushExecutor>,
    destination: Arc<dyn Destination>,
    stats: Arc<CollectorStats>,
}

impl Collector {
    /// Creates a collector that logs background flush failures.
    ///
    /// No task is spawned until the first [`add`](Self::add) or
    /// [`start`](Self::start).
    pub fn new(
        destination: Arc<dyn Destination>,
        config: CollectorConfig,
    ) -> Result<Self, CollectorError> {
        Self::with_error_sink(destination, config, Arc::new(LogErrorSink))
    }

    /// Creates a collector that reports background flush failures to `sink`.
    pub fn with_error_sink(
        destination: Arc<dyn Destination>,
        config: CollectorConfig,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, CollectorError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (done_tx, done_rx) = oneshot::channel();
        let buffer = Arc::new(Buffer::new());
        let stats = Arc::new(CollectorStats::new());
        let worker_state = Arc::new(WorkerStateCell::new());
        let flusher = Arc::new(FlushExecutor::new(
            Arc::clone(&destination),
            config.table.clone(),
            Arc::clone(&buffer),
            Arc::clone(&stats),
        ));

        let worker = Worker {
            rx,
            buffer: Arc::clone(&buffer),
            flusher: Arc::clone(&flusher),
            flush_limit: config.flush_limit,
            sink,
            state: Arc::clone(&worker_state),
            done: done_tx,
        };

        Ok(Self {
            config,
            sender: Mutex::new(Some(tx)),
            pending_worker: Mutex::new(Some(worker)),
            worker_done: Mutex::new(Some(done_rx)),
            start_guard: StartGuard::new(),
            worker_state,
            buffer,
            flusher,
            destination,
            stats,
        })
    }

    /// Ensures the worker task is running. Idempotent and race-free.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime on the call that launches
    /// the worker.
    pub fn start(&self) {
        self.start_guard.ensure_started(|| match lock(&self.pending_worker).take() {
            Some(worker) => {
                debug!("Launching worker for {}", self.config.table);
                tokio::spawn(worker.run());
            }
            None => error!(
                "Worker for {} was already taken; not launching a second one",
                self.config.table
            ),
        });
    }

    /// Enqueues one row, waiting while the queue is full.
    ///
    /// Starts the worker if it is not running yet. Fails only with
    /// [`CollectorError::Misuse`] once [`stop`](Self::stop) has begun.
    pub async fn add(&self, row: Row) -> Result<(), CollectorError> {
        let sender = lock(&self.sender)
            .clone()
            .ok_or(CollectorError::Misuse("add called after stop"))?;

        self.start();
        sender
            .send(row)
            .await
            .map_err(|_| CollectorError::Misuse("row queue is closed"))?;
        self.stats.increment(StatKind::RowsAccepted);
        Ok(())
    }

    /// Stops the collector: close the queue, drain it, flush, close.
    ///
    /// Rows added before `stop` was called are flushed (or dropped by a
    /// reported flush failure) before this returns. The final flush runs
    /// once; its rows are not retried if it fails. The destination is closed
    /// even when the flush failed.
    ///
    /// # Errors
    ///
    /// - the final flush error (`Prepare`, `Append` or `Send`)
    /// - [`CollectorError::Close`] if only the close failed
    /// - [`CollectorError::Shutdown`] if both failed
    /// - [`CollectorError::Misuse`] if `stop` was already called
    pub async fn stop(&self) -> Result<(), CollectorError> {
        let Some(sender) = lock(&self.sender).take() else {
            return Err(CollectorError::Misuse("stop called more than once"));
        };
        // Producers still mid-`add` hold clones; the queue closes when they finish.
        drop(sender);
        info!("Stopping collector for {}", self.config.table);

        // A producer may have cloned the sender without launching yet; starting
        // here means there is always exactly one worker to wait for.
        self.start();
        let done = lock(&self.worker_done).take();
        if let Some(done) = done {
            if done.await.is_err() {
                error!(
                    "Worker for {} terminated abnormally; flushing what it buffered",
                    self.config.table
                );
            }
        }

        let flushed = self.flusher.flush().await;
        match &flushed {
            Ok(FlushOutcome::Committed { rows }) => {
                debug!("Final flush wrote {} rows into {}", rows, self.config.table)
            }
            Ok(FlushOutcome::Empty) => {}
            Err(e) => warn!("Final flush into {} failed: {}", self.config.table, e),
        }

        let closed = self.destination.close().await;
        if let Err(e) = &closed {
            warn!("Closing destination for {} failed: {}", self.config.table, e);
        }

        match (flushed, closed) {
            (Ok(_), Ok(())) => {
                info!("Collector for {} stopped", self.config.table);
                Ok(())
            }
            (Err(flush), Ok(())) => Err(flush),
            (Ok(_), Err(close)) => Err(CollectorError::Close(close)),
            (Err(flush), Err(close)) => Err(CollectorError::Shutdown {
                flush: Box::new(flush),
                close,
            }),
        }
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Rows currently held in the buffer (not yet flushed).
    pub fn buffered(&self) -> usize {
        self.buffer.count()
    }

    pub fn is_started(&self) -> bool {
        self.start_guard.is_started()
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker_state.get()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if lock(&self.sender).is_some() {
            warn!(
                "Collector for {} dropped without stop(); {} buffered rows will not be flushed",
                self.config.table,
                self.buffer.count()
            );
        }
    }
}

//! In-memory destination.
//!
//! Records every committed batch and can be told to fail at any stage. Used
//! for dry runs from the CLI and as the destination double in tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error_handling::DestinationError;
use crate::storage::models::{Row, Value};

use super::{check_arity, Batch, Destination};

/// A batch that was committed to a [`MemoryDestination`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryBatchRecord {
    pub table: String,
    pub rows: Vec<Row>,
}

#[derive(Default)]
struct MemoryState {
    committed: Vec<MemoryBatchRecord>,
    columns: Option<usize>,
    send_delay: Option<Duration>,
    fail_prepare: bool,
    fail_append_at: Option<usize>,
    fail_send: bool,
    fail_close: bool,
    prepare_calls: usize,
    close_calls: usize,
    closed: bool,
}

/// Destination that keeps committed batches in memory.
///
/// Failure switches (`fail_next_*`) arm a single failure for the next batch
/// and reset once it has been consumed. `fail_close` stays armed.
#[derive(Default)]
pub struct MemoryDestination {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects rows whose length differs from `columns`.
    pub fn with_columns(self, columns: usize) -> Self {
        self.lock().columns = Some(columns);
        self
    }

    /// Sleeps this long inside every `send`, to simulate a slow store.
    pub fn with_send_delay(self, delay: Duration) -> Self {
        self.lock().send_delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The next `prepare_batch` fails.
    pub fn fail_next_prepare(&self) {
        self.lock().fail_prepare = true;
    }

    /// The next batch fails when appending its row at `index` (0-based).
    pub fn fail_next_append_at(&self, index: usize) {
        self.lock().fail_append_at = Some(index);
    }

    /// The next batch fails on `send`.
    pub fn fail_next_send(&self) {
        self.lock().fail_send = true;
    }

    /// Every `close` fails (the destination still counts as closed).
    pub fn fail_close(&self) {
        self.lock().fail_close = true;
    }

    /// Committed batches, oldest first.
    pub fn batches(&self) -> Vec<MemoryBatchRecord> {
        self.lock().committed.clone()
    }

    /// All committed rows in commit order.
    pub fn rows(&self) -> Vec<Row> {
        self.lock()
            .committed
            .iter()
            .flat_map(|b| b.rows.iter().cloned())
            .collect()
    }

    pub fn prepare_calls(&self) -> usize {
        self.lock().prepare_calls
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn Batch>, DestinationError> {
        let mut state = self.lock();
        state.prepare_calls += 1;
        if state.closed {
            return Err(DestinationError::Closed);
        }
        if std::mem::take(&mut state.fail_prepare) {
            return Err(DestinationError::Unreachable("injected prepare failure".into()));
        }

        Ok(Box::new(MemoryBatch {
            state: Arc::clone(&self.state),
            table: table.to_string(),
            columns: state.columns,
            send_delay: state.send_delay,
            fail_append_at: state.fail_append_at.take(),
            fail_send: std::mem::take(&mut state.fail_send),
            rows: Vec::new(),
        }))
    }

    async fn close(&self) -> Result<(), DestinationError> {
        let mut state = self.lock();
        state.close_calls += 1;
        if state.closed {
            return Err(DestinationError::Closed);
        }
        state.closed = true;
        if state.fail_close {
            return Err(DestinationError::Other("injected close failure".into()));
        }
        Ok(())
    }
}

struct MemoryBatch {
    state: Arc<Mutex<MemoryState>>,
    table: String,
    columns: Option<usize>,
    send_delay: Option<Duration>,
    fail_append_at: Option<usize>,
    fail_send: bool,
    rows: Vec<Row>,
}

#[async_trait]
impl Batch for MemoryBatch {
    async fn append(&mut self, row: &[Value]) -> Result<(), DestinationError> {
        if self.fail_append_at == Some(self.rows.len()) {
            return Err(DestinationError::Other(format!(
                "injected append failure at row {}",
                self.rows.len()
            )));
        }
        if let Some(columns) = self.columns {
            check_arity(&self.table, columns, row)?;
        }
        self.rows.push(row.to_vec());
        Ok(())
    }

    async fn send(self: Box<Self>) -> Result<(), DestinationError> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_send {
            return Err(DestinationError::Other("injected send failure".into()));
        }
        let MemoryBatch {
            state, table, rows, ..
        } = *self;
        state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .committed
            .push(MemoryBatchRecord { table, rows });
        Ok(())
    }
}

// storage/flush.rs
// Batched write of buffered rows

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::destination::Destination;
use crate::error_handling::{CollectorError, CollectorStats, StatKind};

use super::buffer::Buffer;
use super::models::Row;

/// Result of a successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The buffer was empty; nothing was sent.
    Empty,
    /// One batch with this many rows was committed.
    Committed { rows: usize },
}

/// Writes the buffer's contents to the destination as one batch.
///
/// A failed flush drops the rows it popped. They are not put back into the
/// buffer and are not retried.
pub struct FlushExecutor {
    destination: Arc<dyn Destination>,
    table: String,
    buffer: Arc<Buffer>,
    stats: Arc<CollectorStats>,
}

impl FlushExecutor {
    pub fn new(
        destination: Arc<dyn Destination>,
        table: impl Into<String>,
        buffer: Arc<Buffer>,
        stats: Arc<CollectorStats>,
    ) -> Self {
        Self {
            destination,
            table: table.into(),
            buffer,
            stats,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Pops the whole buffer and writes it as one batch.
    ///
    /// Flushing an empty buffer is a successful no-op, so this is safe to call
    /// both on every threshold crossing and once more at shutdown.
    pub async fn flush(&self) -> Result<FlushOutcome, CollectorError> {
        let rows = self.buffer.pop_all();
        if rows.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let count = rows.len();
        let started = Instant::now();
        debug!("Flushing batch of {} rows into {}", count, self.table);

        match self.write(&rows).await {
            Ok(()) => {
                self.stats.add(StatKind::RowsFlushed, count);
                self.stats.increment(StatKind::BatchesCommitted);
                debug!(
                    "Successfully flushed {} rows into {} in {:.1?}",
                    count,
                    self.table,
                    started.elapsed()
                );
                Ok(FlushOutcome::Committed { rows: count })
            }
            Err(e) => {
                self.stats.add(StatKind::RowsDropped, count);
                self.stats.increment(StatKind::FlushFailures);
                warn!(
                    "Dropped {} rows for {} after {} failure",
                    count,
                    self.table,
                    e.stage().unwrap_or("flush")
                );
                Err(e)
            }
        }
    }

    /// `INSERT INTO <table>`: prepare, append every row in order, send.
    async fn write(&self, rows: &[Row]) -> Result<(), CollectorError> {
        let mut batch = self
            .destination
            .prepare_batch(&self.table)
            .await
            .map_err(CollectorError::Prepare)?;

        for row in rows {
            batch.append(row).await.map_err(CollectorError::Append)?;
        }

        batch.send().await.map_err(CollectorError::Send)
    }
}

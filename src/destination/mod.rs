//! Bulk-insert destinations.
//!
//! The collector only needs four things from a store: open a batch against a
//! table, append a row to it, send it, and release the connection. Anything
//! offering those is substitutable:
//!
//! - [`ClickHouseDestination`]: ClickHouse over its HTTP interface
//! - [`SqliteDestination`]: a local SQLite database (sqlx pool)
//! - [`MemoryDestination`]: in-process recorder with failure injection

mod clickhouse;
mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error_handling::DestinationError;
use crate::storage::models::Value;

pub use clickhouse::{ClickHouseConfig, ClickHouseDestination};
pub use memory::{MemoryBatchRecord, MemoryDestination};
pub use sqlite::SqliteDestination;

/// A connection to a store that accepts bulk inserts.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Opens a batch insert (`INSERT INTO <table>`).
    ///
    /// Fails if the destination is unreachable, closed, or the table
    /// reference is malformed or unknown.
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn Batch>, DestinationError>;

    /// Releases the connection. Called once, when the collector stops.
    async fn close(&self) -> Result<(), DestinationError>;
}

/// An open batch insert.
///
/// Dropping a batch without calling [`Batch::send`] discards everything
/// appended to it; nothing is committed partially.
#[async_trait]
pub trait Batch: Send {
    /// Appends one row of positional values.
    async fn append(&mut self, row: &[Value]) -> Result<(), DestinationError>;

    /// Commits the batch.
    async fn send(self: Box<Self>) -> Result<(), DestinationError>;
}

/// Checks a row's arity against a known column count.
pub(crate) fn check_arity(
    table: &str,
    expected: usize,
    row: &[Value],
) -> Result<(), DestinationError> {
    if row.len() != expected {
        return Err(DestinationError::ArityMismatch {
            table: table.to_string(),
            expected,
            got: row.len(),
        });
    }
    Ok(())
}

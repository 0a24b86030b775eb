//! ch_collector library: batched bulk inserts into an analytical store
//!
//! This library buffers rows produced by many concurrent tasks and writes
//! them to one destination table in bulk insert batches, so each row does not
//! pay for its own round trip.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ch_collector::{row, ClickHouseConfig, ClickHouseDestination, Collector, CollectorConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let destination = Arc::new(ClickHouseDestination::new(ClickHouseConfig {
//!     url: "http://localhost:8123".into(),
//!     ..Default::default()
//! })?);
//! let config = CollectorConfig {
//!     flush_limit: 10_000,
//!     ..CollectorConfig::new("analytics.events")
//! };
//! let collector = Arc::new(Collector::new(destination, config)?);
//!
//! let mut producers = Vec::new();
//! for worker_id in 0..4u32 {
//!     let collector = Arc::clone(&collector);
//!     producers.push(tokio::spawn(async move {
//!         for seq in 0..1000u32 {
//!             collector.add(row![worker_id, seq, "tick"]).await?;
//!         }
//!         Ok::<_, ch_collector::CollectorError>(())
//!     }));
//! }
//! for p in producers {
//!     p.await??;
//! }
//!
//! collector.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. The worker task is spawned on the
//! runtime that calls the first `add` or `start`.

pub mod app;
mod collector;
pub mod config;
pub mod destination;
mod error_handling;
pub mod initialization;
mod storage;
mod utils;

// Re-export public API
pub use app::{read_rows, IngestReport};
pub use collector::{Collector, StartGuard, WorkerState};
pub use config::{CollectorConfig, DestinationKind, LogFormat, LogLevel, Opt};
pub use destination::{
    Batch, ClickHouseConfig, ClickHouseDestination, Destination, MemoryBatchRecord,
    MemoryDestination, SqliteDestination,
};
pub use error_handling::{
    CollectorError, CollectorStats, DestinationError, ErrorSink, InitializationError,
    LogErrorSink, StatKind, StatsSnapshot,
};
pub use storage::{Buffer, FlushExecutor, FlushOutcome, Row, Value};

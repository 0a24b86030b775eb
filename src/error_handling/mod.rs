//! Error handling and collector statistics.
//!
//! This module provides:
//! - Error type definitions for destinations, the collector and app setup
//! - Error sinks that receive flush failures from the background worker
//! - Thread-safe statistics about accepted, flushed and dropped rows

mod sink;
mod stats;
mod types;

// Re-export public API
pub use sink::{ErrorSink, LogErrorSink};
pub use stats::{CollectorStats, StatKind, StatsSnapshot};
pub use types::{CollectorError, DestinationError, InitializationError};

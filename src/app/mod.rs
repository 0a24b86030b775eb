//! Application layer used by the CLI binary.
//!
//! This module provides input reading, progress logging, shutdown handling,
//! and statistics printing.

pub mod ingest;
pub mod logging;
pub mod shutdown;
pub mod statistics;

// Re-export public API
pub use ingest::{open_input, parse_line, read_rows, IngestReport};
pub use logging::log_progress;
pub use shutdown::{cancel_on_ctrl_c, shutdown_gracefully};
pub use statistics::print_final_statistics;

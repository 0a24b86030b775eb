//! Progress logging utilities.

use log::info;

/// Logs how many rows have been read and the read rate so far.
///
/// # Arguments
///
/// * `start_time` - The start time of ingestion
/// * `rows` - Rows handed to the collector so far
pub fn log_progress(start_time: std::time::Instant, rows: usize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        rows as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Queued {} rows in {:.2} seconds (~{:.0} rows/sec)",
        rows, elapsed_secs, rate
    );
}

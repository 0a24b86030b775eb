//! Statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{StatKind, StatsSnapshot};

use super::ingest::IngestReport;

/// Prints a one-line summary of an ingest run followed by the collector
/// counters.
pub fn print_final_statistics(report: &IngestReport, stats: &StatsSnapshot) {
    print_simple_summary(report, stats);
    print_collector_statistics(stats);
}

/// Prints a simple one-line summary of the run.
///
/// Works with both plain and JSON log formats (log::info! handles formatting).
fn print_simple_summary(report: &IngestReport, stats: &StatsSnapshot) {
    let marker = if stats.rows_dropped == 0 && report.malformed_lines == 0 {
        "✅"
    } else {
        "⚠️"
    };
    info!(
        "{} Read {} row{} ({} malformed lines skipped), wrote {} in {} batch{} in {:.1}s",
        marker,
        report.rows_added,
        if report.rows_added == 1 { "" } else { "s" },
        report.malformed_lines,
        stats.rows_flushed,
        stats.batches_committed,
        if stats.batches_committed == 1 { "" } else { "es" },
        report.elapsed_seconds
    );
}

/// Prints every non-zero collector counter.
pub fn print_collector_statistics(stats: &StatsSnapshot) {
    info!("Collector counts:");
    for kind in StatKind::iter() {
        let count = stats.get(kind);
        if count > 0 {
            info!("   {}: {}", kind.as_str(), count);
        }
    }
}

//! Collector statistics tracking.
//!
//! Thread-safe counters for what happened to rows after they were accepted:
//! how many reached the destination, how many were dropped by a failed
//! flush, and how many flushes failed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;

/// Counter kinds tracked by [`CollectorStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum StatKind {
    /// Rows accepted by `add` (enqueued).
    RowsAccepted,
    /// Rows committed to the destination.
    RowsFlushed,
    /// Batches committed to the destination.
    BatchesCommitted,
    /// Rows popped from the buffer whose batch then failed.
    RowsDropped,
    /// Flushes that returned an error.
    FlushFailures,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::RowsAccepted => "rows accepted",
            StatKind::RowsFlushed => "rows flushed",
            StatKind::BatchesCommitted => "batches committed",
            StatKind::RowsDropped => "rows dropped",
            StatKind::FlushFailures => "flush failures",
        }
    }
}

/// Point-in-time copy of the collector counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub rows_accepted: usize,
    pub rows_flushed: usize,
    pub batches_committed: usize,
    pub rows_dropped: usize,
    pub flush_failures: usize,
}

impl StatsSnapshot {
    pub fn get(&self, kind: StatKind) -> usize {
        match kind {
            StatKind::RowsAccepted => self.rows_accepted,
            StatKind::RowsFlushed => self.rows_flushed,
            StatKind::BatchesCommitted => self.batches_committed,
            StatKind::RowsDropped => self.rows_dropped,
            StatKind::FlushFailures => self.flush_failures,
        }
    }
}

/// Thread-safe collector statistics.
///
/// Every [`StatKind`] is initialized to zero on creation, so lookups never
/// miss. Shared between producers, the worker and the flush path via `Arc`.
pub struct CollectorStats {
    counters: HashMap<StatKind, AtomicUsize>,
}

impl CollectorStats {
    pub fn new() -> Self {
        let counters = StatKind::iter()
            .map(|kind| (kind, AtomicUsize::new(0)))
            .collect();
        CollectorStats { counters }
    }

    /// Adds `n` to a counter.
    pub fn add(&self, kind: StatKind, n: usize) {
        if let Some(counter) = self.counters.get(&kind) {
            counter.fetch_add(n, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in CollectorStats initialization.",
                kind
            );
        }
    }

    pub fn increment(&self, kind: StatKind) {
        self.add(kind, 1);
    }

    /// Current value of a counter.
    pub fn get(&self, kind: StatKind) -> usize {
        self.counters
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rows_accepted: self.get(StatKind::RowsAccepted),
            rows_flushed: self.get(StatKind::RowsFlushed),
            batches_committed: self.get(StatKind::BatchesCommitted),
            rows_dropped: self.get(StatKind::RowsDropped),
            flush_failures: self.get(StatKind::FlushFailures),
        }
    }
}

impl Default for CollectorStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CollectorStats::new();
        for kind in StatKind::iter() {
            assert_eq!(stats.get(kind), 0, "{:?} should start at zero", kind);
        }
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_stats_add_and_snapshot() {
        let stats = CollectorStats::new();
        stats.add(StatKind::RowsFlushed, 5);
        stats.increment(StatKind::BatchesCommitted);
        stats.add(StatKind::RowsDropped, 2);
        stats.increment(StatKind::FlushFailures);

        let snap = stats.snapshot();
        assert_eq!(snap.rows_flushed, 5);
        assert_eq!(snap.batches_committed, 1);
        assert_eq!(snap.rows_dropped, 2);
        assert_eq!(snap.flush_failures, 1);
        assert_eq!(snap.rows_accepted, 0);
    }

    #[test]
    fn test_all_stat_kinds_have_labels() {
        for kind in StatKind::iter() {
            assert!(!kind.as_str().is_empty(), "{:?} needs a label", kind);
        }
    }
}

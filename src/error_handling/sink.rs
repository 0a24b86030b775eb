//! Error sinks for background flush failures.

use super::types::CollectorError;

/// Receives errors that have no synchronous caller to return to.
///
/// The worker loop reports threshold-triggered flush failures here and keeps
/// running. Implementations must not block: they are called from the worker
/// task between two queue receives.
pub trait ErrorSink: Send + Sync {
    /// Reports a flush failure for `table`.
    fn report(&self, table: &str, error: &CollectorError);
}

/// Default sink: logs every failure at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, table: &str, error: &CollectorError) {
        log::error!("Flush to {} failed: {}", table, error);
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &CollectorError) + Send + Sync,
{
    fn report(&self, table: &str, error: &CollectorError) {
        self(table, error)
    }
}

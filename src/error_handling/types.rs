//! Error type definitions.
//!
//! This module defines the errors raised by destinations, by the collector
//! core, and by application setup.

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the HTTP client used by the ClickHouse destination.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// Error opening the SQLite destination.
    #[error("Database initialization error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Invalid destination settings (bad URL, missing table, etc.).
    #[error("Destination configuration error: {0}")]
    DestinationConfigError(String),
}

/// Failure reported by a destination collaborator.
///
/// The collector never inspects these beyond wrapping them in the matching
/// [`CollectorError`] stage, so destinations are free to pick whichever
/// variant describes the failure best.
#[derive(Error, Debug)]
pub enum DestinationError {
    /// The destination could not be reached.
    #[error("destination unreachable: {0}")]
    Unreachable(String),

    /// The table reference is not a valid identifier.
    #[error("malformed table reference: {0:?}")]
    MalformedTable(String),

    /// The table does not exist at the destination.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A row does not have as many values as the table has columns.
    #[error("row has {got} values, table {table} has {expected} columns")]
    ArityMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    /// A value could not be encoded for the destination.
    #[error("value cannot be encoded: {0}")]
    Encoding(String),

    /// The destination answered, but refused the request.
    #[error("destination rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The handle has already been closed.
    #[error("destination connection is closed")]
    Closed,

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Any other failure, mostly used by test doubles.
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the collector.
///
/// `Prepare`, `Append` and `Send` come out of a flush. During normal
/// operation they are only seen by the error sink; the final flush run by
/// `stop` returns them to the caller.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// A batch could not be opened against the destination table.
    #[error("prepare error: {0}")]
    Prepare(#[source] DestinationError),

    /// A row could not be appended; the whole batch was discarded.
    #[error("append error: {0}")]
    Append(#[source] DestinationError),

    /// The batch could not be committed; its rows were dropped.
    #[error("send error: {0}")]
    Send(#[source] DestinationError),

    /// The destination connection could not be released.
    #[error("close error: {0}")]
    Close(#[source] DestinationError),

    /// Both the final flush and the connection release failed.
    #[error("shutdown flush failed: {flush}; close also failed: {close}")]
    Shutdown {
        flush: Box<CollectorError>,
        close: DestinationError,
    },

    /// The collector was used in a way its contract forbids, such as adding
    /// rows after `stop` began.
    #[error("collector misuse: {0}")]
    Misuse(&'static str),

    /// Invalid collector configuration.
    #[error("invalid collector configuration: {0}")]
    Config(String),
}

impl CollectorError {
    /// The flush stage that failed, if this error came from a flush.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            CollectorError::Prepare(_) => Some("prepare"),
            CollectorError::Append(_) => Some("append"),
            CollectorError::Send(_) => Some("send"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_errors_have_stage_prefixes() {
        let err = CollectorError::Prepare(DestinationError::UnknownTable("events".into()));
        assert_eq!(err.to_string(), "prepare error: unknown table: events");

        let err = CollectorError::Append(DestinationError::ArityMismatch {
            table: "events".into(),
            expected: 3,
            got: 2,
        });
        assert_eq!(
            err.to_string(),
            "append error: row has 2 values, table events has 3 columns"
        );

        let err = CollectorError::Send(DestinationError::Rejected {
            status: 500,
            message: "boom".into(),
        });
        assert!(err.to_string().starts_with("send error: "));
    }

    #[test]
    fn test_stage_only_for_flush_errors() {
        assert_eq!(
            CollectorError::Send(DestinationError::Closed).stage(),
            Some("send")
        );
        assert_eq!(
            CollectorError::Close(DestinationError::Closed).stage(),
            None
        );
        assert_eq!(CollectorError::Misuse("x").stage(), None);
    }

    #[test]
    fn test_shutdown_error_mentions_both_causes() {
        let err = CollectorError::Shutdown {
            flush: Box::new(CollectorError::Send(DestinationError::Other(
                "write failed".into(),
            ))),
            close: DestinationError::Other("socket gone".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("write failed"), "{msg}");
        assert!(msg.contains("socket gone"), "{msg}");
    }
}

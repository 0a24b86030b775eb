//! Configuration constants.
//!
//! Defaults for the collector and for the bundled destinations.

use std::time::Duration;

/// Default capacity of the row queue between producers and the worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default number of buffered rows that triggers a flush.
pub const DEFAULT_FLUSH_LIMIT: usize = 1000;

/// Default ClickHouse HTTP interface endpoint.
pub const DEFAULT_CLICKHOUSE_URL: &str = "http://localhost:8123";

/// Default ClickHouse database.
pub const DEFAULT_CLICKHOUSE_DATABASE: &str = "default";

/// Default ClickHouse user.
pub const DEFAULT_CLICKHOUSE_USER: &str = "default";

/// Environment variable holding the ClickHouse password.
///
/// Read after `.env` has been loaded so the password never has to appear on
/// the command line.
pub const CLICKHOUSE_PASSWORD_ENV: &str = "CLICKHOUSE_PASSWORD";

/// Default SQLite database path for the `sqlite` destination.
pub const DEFAULT_SQLITE_PATH: &str = "./ch_collector.db";

/// Timeout for a single HTTP request to ClickHouse (DESCRIBE or INSERT).
/// Inserts of a full batch can be slow on a busy server, so this is generous.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// TCP connect timeout for the ClickHouse HTTP client.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum length of a server error message kept in an error value.
/// ClickHouse can answer with multi-kilobyte stack traces.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;

/// Output format used for inserts over the ClickHouse HTTP interface.
pub const CLICKHOUSE_INSERT_FORMAT: &str = "JSONCompactEachRow";

/// Log ingestion progress every this many rows.
pub const PROGRESS_INTERVAL_ROWS: usize = 100_000;

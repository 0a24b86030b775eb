//! Configuration types and CLI options.
//!
//! This module defines the library configuration for a collector and the
//! enums and structs used for command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_CLICKHOUSE_DATABASE, DEFAULT_CLICKHOUSE_URL, DEFAULT_CLICKHOUSE_USER,
    DEFAULT_FLUSH_LIMIT, DEFAULT_QUEUE_CAPACITY, DEFAULT_SQLITE_PATH,
};
use crate::error_handling::CollectorError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which destination the CLI writes to.
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DestinationKind {
    /// ClickHouse over its HTTP interface
    Clickhouse,
    /// Local SQLite database file
    Sqlite,
    /// Keep batches in memory and discard them (dry run)
    Memory,
}

/// Collector configuration (no CLI dependencies).
///
/// One collector writes to exactly one table.
///
/// # Examples
///
/// ```
/// use ch_collector::CollectorConfig;
///
/// let config = CollectorConfig {
///     flush_limit: 500,
///     ..CollectorConfig::new("events")
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Destination table, optionally qualified as `database.table`
    pub table: String,

    /// Buffered row count that triggers a flush
    pub flush_limit: usize,

    /// Capacity of the row queue; producers wait when it is full
    pub queue_capacity: usize,
}

impl CollectorConfig {
    /// Configuration for `table` with default limits.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            flush_limit: DEFAULT_FLUSH_LIMIT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Checks that the table is named and both limits are positive.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.table.trim().is_empty() {
            return Err(CollectorError::Config("table name is empty".into()));
        }
        if self.flush_limit == 0 {
            return Err(CollectorError::Config(
                "flush_limit must be greater than zero".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CollectorError::Config(
                "queue_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
///
/// # Examples
///
/// ```bash
/// # Stream a JSONL file into ClickHouse
/// ch_collector rows.jsonl --table events
///
/// # Read rows from stdin, flush every 10k rows
/// cat rows.jsonl | ch_collector - --table events --flush-limit 10000
///
/// # Write into a local SQLite file instead
/// ch_collector rows.jsonl --table events --destination sqlite --db-path ./events.db
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "ch_collector",
    about = "Buffers JSON rows and writes them to a table in bulk insert batches."
)]
pub struct Opt {
    /// File with one JSON array per line, or `-` for stdin
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Destination table (optionally `database.table`)
    #[arg(long)]
    pub table: String,

    /// Destination kind: clickhouse|sqlite|memory
    #[arg(long, value_enum, default_value_t = DestinationKind::Clickhouse)]
    pub destination: DestinationKind,

    /// ClickHouse HTTP endpoint
    #[arg(long, default_value = DEFAULT_CLICKHOUSE_URL)]
    pub url: String,

    /// ClickHouse database
    #[arg(long, default_value = DEFAULT_CLICKHOUSE_DATABASE)]
    pub database: String,

    /// ClickHouse user (password is read from CLICKHOUSE_PASSWORD)
    #[arg(long, default_value = DEFAULT_CLICKHOUSE_USER)]
    pub user: String,

    /// SQLite database path for `--destination sqlite`
    #[arg(long, value_parser, default_value = DEFAULT_SQLITE_PATH)]
    pub db_path: PathBuf,

    /// Buffered row count that triggers a flush
    #[arg(long, default_value_t = DEFAULT_FLUSH_LIMIT)]
    pub flush_limit: usize,

    /// Row queue capacity
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Opt {
    /// Collector settings carried by the command line.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            table: self.table.clone(),
            flush_limit: self.flush_limit,
            queue_capacity: self.queue_capacity,
        }
    }
}

//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - Destination connection selected on the command line
//!
//! All initialization functions return proper error types for error handling.

mod logger;

use std::sync::Arc;

use log::info;

use crate::config::{DestinationKind, Opt, CLICKHOUSE_PASSWORD_ENV};
use crate::destination::{
    ClickHouseConfig, ClickHouseDestination, Destination, MemoryDestination, SqliteDestination,
};
use crate::error_handling::InitializationError;

// Re-export public API
pub use logger::init_logger_with;

/// Builds the destination selected by `opt`.
///
/// For ClickHouse the password comes from the `CLICKHOUSE_PASSWORD`
/// environment variable (a `.env` file is loaded by the binary first).
pub async fn init_destination(opt: &Opt) -> Result<Arc<dyn Destination>, InitializationError> {
    match opt.destination {
        DestinationKind::Clickhouse => {
            let config = ClickHouseConfig {
                url: opt.url.clone(),
                database: opt.database.clone(),
                user: opt.user.clone(),
                password: std::env::var(CLICKHOUSE_PASSWORD_ENV).ok(),
            };
            info!(
                "Writing to ClickHouse at {} (database {})",
                config.url, config.database
            );
            Ok(Arc::new(ClickHouseDestination::new(config)?))
        }
        DestinationKind::Sqlite => {
            info!("Writing to SQLite database {}", opt.db_path.display());
            Ok(Arc::new(SqliteDestination::open(&opt.db_path).await?))
        }
        DestinationKind::Memory => {
            info!("Dry run: batches are kept in memory and discarded");
            Ok(Arc::new(MemoryDestination::new()))
        }
    }
}

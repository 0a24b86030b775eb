// Shared test helpers for collector and destination setup.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::path::Path;
use std::sync::Arc;

use ch_collector::{Collector, CollectorConfig, Destination, MemoryDestination, SqliteDestination};

/// Creates a collector over a fresh in-memory destination.
/// Returns the destination too so tests can inspect committed batches.
#[allow(dead_code)] // Used by other test files
pub fn create_memory_collector(
    flush_limit: usize,
    queue_capacity: usize,
) -> (Arc<Collector>, Arc<MemoryDestination>) {
    let dest = Arc::new(MemoryDestination::new());
    let destination: Arc<dyn Destination> = dest.clone();
    let config = CollectorConfig {
        flush_limit,
        queue_capacity,
        ..CollectorConfig::new("events")
    };
    let collector = Collector::new(destination, config).expect("Failed to create collector");
    (Arc::new(collector), dest)
}

/// Creates a SQLite destination at `db_path` with an `events(id, name)` table.
#[allow(dead_code)] // Used by other test files
pub async fn create_sqlite_destination(db_path: &Path) -> SqliteDestination {
    let dest = SqliteDestination::open(db_path)
        .await
        .expect("Failed to open test database");
    sqlx::query("CREATE TABLE IF NOT EXISTS events (id INTEGER NOT NULL, name TEXT NOT NULL)")
        .execute(dest.pool())
        .await
        .expect("Failed to create events table");
    dest
}

/// Extracts the integer id from the first column of a row.
#[allow(dead_code)] // Used by other test files
pub fn row_id(row: &[ch_collector::Value]) -> i64 {
    match row.first() {
        Some(ch_collector::Value::Int(i)) => *i,
        other => panic!("expected integer id, got {:?}", other),
    }
}

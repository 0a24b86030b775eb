//! SQLite destination.
//!
//! A batch is a transaction: each append executes one positional `INSERT`,
//! `send` commits. Dropping an unsent batch rolls the transaction back, so a
//! failed append leaves no rows behind.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use log::{error, info};
use sqlx::{Row as _, Sqlite, SqlitePool, Transaction};

use crate::error_handling::{DestinationError, InitializationError};
use crate::storage::models::{format_datetime, Value};
use crate::utils::is_valid_table_name;

use super::{check_arity, Batch, Destination};

/// SQLite destination backed by a sqlx pool.
pub struct SqliteDestination {
    pool: SqlitePool,
}

impl SqliteDestination {
    /// Wraps an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database file at `db_path`.
    ///
    /// Enables WAL mode so readers are not blocked while a batch commits.
    pub async fn open(db_path: &Path) -> Result<Self, InitializationError> {
        let db_path_str = db_path.to_string_lossy().to_string();
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&db_path_str)
        {
            Ok(_) => info!("Database file created successfully."),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Database file already exists.")
            }
            Err(e) => {
                error!("Failed to create database file: {e}");
                return Err(InitializationError::DestinationConfigError(e.to_string()));
            }
        }

        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {e}");
                InitializationError::DatabaseError(e)
            })?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(|e| {
                error!("Failed to set WAL mode: {e}");
                InitializationError::DatabaseError(e)
            })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Column names of `table`, in declaration order.
    ///
    /// `schema.table` is looked up in the attached schema of that name.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DestinationError> {
        let pragma = match table.split_once('.') {
            Some((schema, name)) => format!("PRAGMA {schema}.table_info({name})"),
            None => format!("PRAGMA table_info({table})"),
        };
        let rows = sqlx::query(&pragma).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("name").map_err(DestinationError::from))
            .collect()
    }
}

#[async_trait]
impl Destination for SqliteDestination {
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn Batch>, DestinationError> {
        if self.pool.is_closed() {
            return Err(DestinationError::Closed);
        }
        if !is_valid_table_name(table) {
            return Err(DestinationError::MalformedTable(table.to_string()));
        }

        let columns = self.table_columns(table).await?;
        if columns.is_empty() {
            return Err(DestinationError::UnknownTable(table.to_string()));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!("INSERT INTO {table} VALUES ({placeholders})");
        let tx = self.pool.begin().await?;

        Ok(Box::new(SqliteBatch {
            table: table.to_string(),
            columns: columns.len(),
            insert_sql,
            tx,
        }))
    }

    async fn close(&self) -> Result<(), DestinationError> {
        if self.pool.is_closed() {
            return Err(DestinationError::Closed);
        }
        self.pool.close().await;
        Ok(())
    }
}

struct SqliteBatch {
    table: String,
    columns: usize,
    insert_sql: String,
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl Batch for SqliteBatch {
    async fn append(&mut self, row: &[Value]) -> Result<(), DestinationError> {
        check_arity(&self.table, self.columns, row)?;

        let mut query = sqlx::query(&self.insert_sql);
        for value in row {
            query = match value {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::Int(i) => query.bind(*i),
                Value::UInt(u) => {
                    let i = i64::try_from(*u).map_err(|_| {
                        DestinationError::Encoding(format!("{u} does not fit in a SQLite INTEGER"))
                    })?;
                    query.bind(i)
                }
                Value::Float(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::DateTime(ts) => query.bind(format_datetime(ts)),
            };
        }
        query.execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn send(self: Box<Self>) -> Result<(), DestinationError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_destination() -> SqliteDestination {
        // One connection: the open batch and later reads share it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database pool");
        sqlx::query("CREATE TABLE events (id INTEGER NOT NULL, name TEXT, score REAL)")
            .execute(&pool)
            .await
            .expect("Failed to create table");
        SqliteDestination::new(pool)
    }

    async fn count_rows(dest: &SqliteDestination) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(dest.pool())
            .await
            .expect("Failed to count rows")
    }

    #[tokio::test]
    async fn test_batch_commits_all_rows() {
        let dest = create_test_destination().await;
        let mut batch = dest.prepare_batch("events").await.unwrap();
        batch.append(&row![1, "a", 0.5]).await.unwrap();
        batch.append(&row![2, None::<String>, 1.5]).await.unwrap();
        batch.send().await.unwrap();

        assert_eq!(count_rows(&dest).await, 2);
    }

    #[tokio::test]
    async fn test_dropped_batch_rolls_back() {
        let dest = create_test_destination().await;
        let mut batch = dest.prepare_batch("events").await.unwrap();
        batch.append(&row![1, "a", 0.5]).await.unwrap();
        let err = batch.append(&row![2, "b"]).await.unwrap_err();
        assert!(matches!(
            err,
            DestinationError::ArityMismatch {
                expected: 3,
                got: 2,
                ..
            }
        ));
        drop(batch);

        assert_eq!(count_rows(&dest).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tables() {
        let dest = create_test_destination().await;
        assert!(matches!(
            dest.prepare_batch("missing").await.err(),
            Some(DestinationError::UnknownTable(_))
        ));
        assert!(matches!(
            dest.prepare_batch("events)").await.err(),
            Some(DestinationError::MalformedTable(_))
        ));
    }

    #[tokio::test]
    async fn test_uint_overflow_is_encoding_error() {
        let dest = create_test_destination().await;
        let mut batch = dest.prepare_batch("events").await.unwrap();
        let err = batch.append(&row![u64::MAX, "a", 0.5]).await.unwrap_err();
        assert!(matches!(err, DestinationError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_close_once() {
        let dest = create_test_destination().await;
        dest.close().await.unwrap();
        assert!(matches!(dest.close().await, Err(DestinationError::Closed)));
        assert!(matches!(
            dest.prepare_batch("events").await.err(),
            Some(DestinationError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("collector.db");
        let dest = SqliteDestination::open(&path).await.unwrap();
        assert!(path.exists());
        dest.close().await.unwrap();
    }
}

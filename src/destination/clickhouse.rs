//! ClickHouse destination over the HTTP interface.
//!
//! A batch is a `JSONCompactEachRow` body built in memory: one JSON array per
//! row, in table column order. Preparing a batch runs `DESCRIBE TABLE` so that
//! rows with the wrong number of values fail at append time instead of
//! poisoning the whole insert on the server.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::{
    CLICKHOUSE_INSERT_FORMAT, DEFAULT_CLICKHOUSE_DATABASE, DEFAULT_CLICKHOUSE_URL,
    DEFAULT_CLICKHOUSE_USER, HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT,
};
use crate::error_handling::{DestinationError, InitializationError};
use crate::storage::models::Value;
use crate::utils::{is_valid_table_name, sanitize_and_truncate_error_message};

use super::{check_arity, Batch, Destination};

/// Connection settings for [`ClickHouseDestination`].
#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    /// HTTP endpoint, e.g. `http://localhost:8123`
    pub url: String,
    /// Database used for unqualified table names
    pub database: String,
    pub user: String,
    pub password: Option<String>,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CLICKHOUSE_URL.to_string(),
            database: DEFAULT_CLICKHOUSE_DATABASE.to_string(),
            user: DEFAULT_CLICKHOUSE_USER.to_string(),
            password: None,
        }
    }
}

/// One line of `DESCRIBE TABLE ... FORMAT JSONEachRow`.
#[derive(Debug, Deserialize)]
struct DescribeRow {
    name: String,
    #[serde(default)]
    default_type: String,
}

impl DescribeRow {
    /// MATERIALIZED and ALIAS columns cannot appear in an INSERT.
    fn is_insertable(&self) -> bool {
        !matches!(self.default_type.as_str(), "MATERIALIZED" | "ALIAS")
    }
}

/// ClickHouse HTTP destination.
pub struct ClickHouseDestination {
    client: Client,
    endpoint: Url,
    config: ClickHouseConfig,
    closed: AtomicBool,
}

impl ClickHouseDestination {
    /// Builds the HTTP client. No request is made until the first batch.
    pub fn new(config: ClickHouseConfig) -> Result<Self, InitializationError> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            InitializationError::DestinationConfigError(format!(
                "invalid ClickHouse URL {:?}: {e}",
                config.url
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(InitializationError::DestinationConfigError(format!(
                "unsupported ClickHouse URL scheme: {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .connect_timeout(std::time::Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// POST request carrying `query`, with database and credentials set.
    fn request(&self, query: &str) -> RequestBuilder {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .query(&[("query", query), ("database", self.config.database.as_str())])
            .header("X-ClickHouse-User", &self.config.user);
        if let Some(password) = &self.config.password {
            request = request.header("X-ClickHouse-Key", password);
        }
        request
    }

    /// Names of the insertable columns of `table`, in order.
    async fn describe(&self, table: &str) -> Result<Vec<String>, DestinationError> {
        let query = format!("DESCRIBE TABLE {table} FORMAT JSONEachRow");
        let response = self
            .request(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(server_error(table, status, &body));
        }

        let mut columns = Vec::new();
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let row: DescribeRow = serde_json::from_str(line).map_err(|e| {
                DestinationError::Other(format!("unexpected DESCRIBE output: {e}"))
            })?;
            if row.is_insertable() {
                columns.push(row.name);
            }
        }
        if columns.is_empty() {
            return Err(DestinationError::UnknownTable(table.to_string()));
        }
        Ok(columns)
    }
}

#[async_trait]
impl Destination for ClickHouseDestination {
    async fn prepare_batch(&self, table: &str) -> Result<Box<dyn Batch>, DestinationError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DestinationError::Closed);
        }
        if !is_valid_table_name(table) {
            return Err(DestinationError::MalformedTable(table.to_string()));
        }

        let columns = self.describe(table).await?;
        debug!("Prepared batch for {} ({} columns)", table, columns.len());

        let insert = format!("INSERT INTO {table} FORMAT {CLICKHOUSE_INSERT_FORMAT}");
        Ok(Box::new(ClickHouseBatch {
            table: table.to_string(),
            columns: columns.len(),
            request: self.request(&insert),
            body: Vec::new(),
        }))
    }

    async fn close(&self) -> Result<(), DestinationError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(DestinationError::Closed);
        }
        debug!("ClickHouse destination {} closed", self.endpoint);
        Ok(())
    }
}

/// Batch body under construction.
struct ClickHouseBatch {
    table: String,
    columns: usize,
    request: RequestBuilder,
    body: Vec<u8>,
}

#[async_trait]
impl Batch for ClickHouseBatch {
    async fn append(&mut self, row: &[Value]) -> Result<(), DestinationError> {
        check_arity(&self.table, self.columns, row)?;
        for (column, value) in row.iter().enumerate() {
            match value {
                Value::Float(f) if !f.is_finite() => {
                    return Err(DestinationError::Encoding(format!(
                        "non-finite float {f} in column {column} cannot be sent as JSON"
                    )));
                }
                Value::Bytes(b) => {
                    if let Err(e) = std::str::from_utf8(b) {
                        return Err(DestinationError::Encoding(format!(
                            "bytes in column {column} are not valid UTF-8 ({e})"
                        )));
                    }
                }
                _ => {}
            }
        }

        serde_json::to_writer(&mut self.body, row)
            .map_err(|e| DestinationError::Encoding(e.to_string()))?;
        self.body.push(b'\n');
        Ok(())
    }

    async fn send(self: Box<Self>) -> Result<(), DestinationError> {
        let ClickHouseBatch {
            table,
            request,
            body,
            ..
        } = *self;

        let response = request.body(body).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(server_error(&table, status, &message));
        }
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> DestinationError {
    if e.is_connect() || e.is_timeout() {
        DestinationError::Unreachable(e.to_string())
    } else {
        DestinationError::Http(e)
    }
}

/// Maps a non-2xx ClickHouse answer to an error.
///
/// ClickHouse reports a missing table as `Code: 60` / `UNKNOWN_TABLE`.
fn server_error(table: &str, status: StatusCode, body: &str) -> DestinationError {
    if body.contains("UNKNOWN_TABLE") || body.starts_with("Code: 60.") {
        return DestinationError::UnknownTable(table.to_string());
    }
    DestinationError::Rejected {
        status: status.as_u16(),
        message: sanitize_and_truncate_error_message(body),
    }
}

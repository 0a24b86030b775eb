//! Reading JSON rows from a file or stdin into a collector.
//!
//! Input is one JSON array per line; each array is one row in table column
//! order. Blank lines and lines starting with `#` are skipped. Lines that do
//! not parse are logged and counted, never sent.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::collector::Collector;
use crate::config::PROGRESS_INTERVAL_ROWS;
use crate::storage::{Row, Value};

use super::logging::log_progress;

/// What happened while reading the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Lines read, including skipped ones
    pub lines_read: usize,
    /// Rows handed to the collector
    pub rows_added: usize,
    pub malformed_lines: usize,
    /// Reading stopped early because of Ctrl-C
    pub interrupted: bool,
    pub elapsed_seconds: f64,
}

/// Opens `path` for line reading; `-` means stdin.
pub async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        info!("Reading rows from stdin");
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parses one input line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Row>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
    Ok(Some(values.into_iter().map(Value::from).collect()))
}

/// Feeds every row of `reader` into `collector` until EOF or cancellation.
///
/// Does not stop the collector; the caller decides when to.
pub async fn read_rows<R>(
    reader: R,
    collector: &Collector,
    cancel: &CancellationToken,
) -> Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
{
    let start_time = Instant::now();
    let mut report = IngestReport::default();
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.interrupted = true;
                break;
            }
            line = lines.next_line() => line.context("Failed to read input line")?,
        };
        let Some(line) = line else {
            break;
        };
        report.lines_read += 1;

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(row)) => {
                collector.add(row).await?;
                report.rows_added += 1;
                if report.rows_added % PROGRESS_INTERVAL_ROWS == 0 {
                    log_progress(start_time, report.rows_added);
                }
            }
            Err(e) => {
                warn!("Skipping malformed line {}: {}", report.lines_read, e);
                report.malformed_lines += 1;
            }
        }
    }

    report.elapsed_seconds = start_time.elapsed().as_secs_f64();
    Ok(report)
}

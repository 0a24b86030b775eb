//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `ch_collector` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use ch_collector::app::{
    cancel_on_ctrl_c, open_input, print_final_statistics, read_rows, shutdown_gracefully,
};
use ch_collector::initialization::{init_destination, init_logger_with};
use ch_collector::{Collector, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), so
    // CLICKHOUSE_PASSWORD does not have to be exported manually
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let input = open_input(&opt.file).await?;
    let destination = init_destination(&opt)
        .await
        .context("Failed to initialize destination")?;
    let collector = Collector::new(destination, opt.collector_config())
        .context("Invalid collector configuration")?;
    collector.start();

    let cancel = CancellationToken::new();
    let signal_task = cancel_on_ctrl_c(cancel.clone());

    let ingest = read_rows(input, &collector, &cancel).await;

    // Stop even if reading failed, so rows already queued are flushed
    let stopped = shutdown_gracefully(&collector, cancel, Some(signal_task)).await;
    let stats = collector.stats();

    let report = match ingest {
        Ok(report) => report,
        Err(e) => {
            eprintln!("ch_collector error: {:#}", e);
            process::exit(1);
        }
    };
    print_final_statistics(&report, &stats);

    match stopped {
        Ok(()) => {
            println!(
                "✅ Wrote {} row{} to {} in {} batch{} ({:.1}s)",
                stats.rows_flushed,
                if stats.rows_flushed == 1 { "" } else { "s" },
                collector.table(),
                stats.batches_committed,
                if stats.batches_committed == 1 { "" } else { "es" },
                report.elapsed_seconds
            );
            if stats.rows_dropped > 0 {
                eprintln!(
                    "⚠️  {} row{} dropped by failed flushes - see log for details",
                    stats.rows_dropped,
                    if stats.rows_dropped == 1 { "" } else { "s" }
                );
                process::exit(2);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("ch_collector error: {:#}", e);
            process::exit(1);
        }
    }
}

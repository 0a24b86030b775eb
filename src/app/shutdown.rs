//! Graceful shutdown handling.

use log::{error, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collector::Collector;
use crate::error_handling::CollectorError;

/// Cancels `cancel` when the process receives Ctrl-C.
///
/// Input reading watches the token, so an interrupt stops reading new rows
/// while everything already queued still gets flushed by
/// [`shutdown_gracefully`]. The task exits on its own once `cancel` is
/// cancelled by anyone else.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    warn!("Received Ctrl-C, finishing queued rows before exit");
                    cancel.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
            },
            _ = cancel.cancelled() => {}
        }
    })
}

/// Stops the signal listener, then stops the collector.
///
/// Returns the collector's shutdown result so the caller can decide the exit
/// status.
pub async fn shutdown_gracefully(
    collector: &Collector,
    cancel: CancellationToken,
    signal_task: Option<JoinHandle<()>>,
) -> Result<(), CollectorError> {
    cancel.cancel();
    if let Some(signal_task) = signal_task {
        let _ = signal_task.await;
    }
    collector.stop().await
}

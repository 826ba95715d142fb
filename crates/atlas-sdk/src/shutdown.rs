//! Shutdown signal handling for foreground runs.

use log::{info, warn};

/// Block until the process receives an interrupt signal.
///
/// Never fails: if signal registration is unavailable the wait degrades to
/// an immediate return so callers still tear down cleanly.
pub(crate) async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(err) => warn!("could not wait for the interrupt signal: {err}"),
    }
}

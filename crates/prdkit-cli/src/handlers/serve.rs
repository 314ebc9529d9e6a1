//! Serve command handler.

use anyhow::Result;
use prdkit_proxy::{ServerConfig, start_server};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the web server until Ctrl-C.
pub async fn execute(config: ServerConfig) -> Result<()> {
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
        shutdown.cancel();
    });

    start_server(config, cancel).await
}

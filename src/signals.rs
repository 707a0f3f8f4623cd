//! OS signal handling for graceful shutdown

use dpilot_core::prelude::*;

/// Wait for a termination signal
///
/// SIGINT or SIGTERM on unix, Ctrl+C elsewhere.
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::terminal(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::terminal(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::terminal(format!("Failed to listen for Ctrl+C: {}", e)))?;
        info!("Received Ctrl+C");
        Ok(())
    }
}

/// Resolves on the first termination signal
///
/// If the handlers cannot be installed the future never resolves, so the
/// caller simply runs to completion.
pub async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        error!("Signal handler error: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal_pending_without_signal() {
        let result = tokio::time::timeout(Duration::from_millis(20), shutdown_signal()).await;
        assert!(result.is_err());
    }
}

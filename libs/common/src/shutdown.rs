//! Signal-driven shutdown

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        },
        Err(e) => {
            warn!("SIGTERM handler unavailable ({}), only Ctrl+C stops the service", e);
            std::future::pending::<()>().await;
        },
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn wait_for_shutdown() {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Ctrl+C handler failed: {}", e);
                terminate().await;
            }
        },
        _ = terminate() => {},
    }
}

/// Cancel `token` on the first shutdown signal
///
/// Returns early without a signal if `token` is cancelled elsewhere.
pub async fn cancel_on_shutdown(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {},
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received");
            token.cancel();
        },
    }
}

//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGTERM (process supervisors) or SIGINT (Ctrl-C)
//! - Translate the first one into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - On non-Unix platforms only Ctrl-C is available

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on the first shutdown signal the process receives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Wait for a signal, then trigger `shutdown`.
pub async fn trigger_on_signal(shutdown: Shutdown) {
    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

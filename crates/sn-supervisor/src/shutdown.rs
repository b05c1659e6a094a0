//! Signal handling (spec §4.9): SIGINT/SIGTERM drain the current in-flight
//! job before exit rather than aborting it mid-flight. The returned
//! `watch::Receiver` is cheap to clone and share between the HTTP server's
//! graceful-shutdown future and every worker's poll loop.

use tokio::sync::watch;

/// Spawns a task that waits for Ctrl-C or SIGTERM and flips the returned
/// receiver to `true` exactly once. Callers observe it either via
/// `*rx.borrow()` (point-in-time check, used between poll iterations) or
/// `rx.changed()` (wake-on-signal, used to interrupt a sleep).
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, draining in-flight work before exit"),
            _ = terminate => tracing::info!("received SIGTERM, draining in-flight work before exit"),
        }

        let _ = tx.send(true);
    });

    rx
}

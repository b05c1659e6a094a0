//! The generic poll-loop shape shared by the ingestion and transcription
//! workers (spec §4.4/§4.5: "same poll-loop shape"). `tick` runs to
//! completion unconditionally — cancellation is only observed in the sleep
//! between iterations, so SIGTERM never aborts an in-flight job (spec §5:
//! "Workers cancel the current job on SIGTERM only between jobs").

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Runs `tick` repeatedly, sleeping `interval` between calls, until
/// `shutdown` is signaled. `label` is logged once at start/stop so
/// multi-worker logs can be told apart.
pub async fn run_poll_loop<F, Fut>(label: &str, interval: Duration, mut shutdown: watch::Receiver<bool>, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!(worker = label, interval_secs = interval.as_secs(), "poll loop starting");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tick().await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(worker = label, "poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn stops_promptly_once_shutdown_is_signaled() {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let handle = tokio::spawn(run_poll_loop("test", Duration::from_secs(60), rx, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}

//! Uniform retry policy for every external adapter (spec §4.3): an initial
//! attempt plus up to three retries on transient failures, waiting 250ms,
//! 1s, then 4s between them. A `BadRequest` never retries — it means the
//! caller sent something the provider will reject every time.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const BACKOFF: [Duration; 3] = [
    Duration::from_millis(250),
    Duration::from_secs(1),
    Duration::from_secs(4),
];

/// Failure taxonomy shared by every `sn-adapters` trait. Concrete adapters
/// classify their own HTTP/parse failures into one of these so `with_retry`
/// (and, downstream, `sn-evidence`'s mapping into `sn_common::SnError`)
/// doesn't need to know about any specific provider's error shapes.
#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    /// Network blip, 5xx, connection reset — worth retrying.
    #[error("transient adapter error: {0}")]
    Transient(String),
    /// Provider-signaled backpressure (429 or equivalent) — worth retrying.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Deadline exceeded waiting on the provider — worth retrying, but
    /// surfaced as a timeout if it never recovers.
    #[error("adapter call timed out: {0}")]
    Timeout(String),
    /// 4xx-equivalent: malformed input, unsupported content, missing asset.
    /// Retrying would just reproduce the same rejection.
    #[error("bad request to adapter: {0}")]
    BadRequest(String),
}

impl AdapterError {
    fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_) | AdapterError::RateLimited(_) | AdapterError::Timeout(_))
    }
}

/// Maps into the spec §7 taxonomy: a transient/rate-limited failure that
/// survived every retry is a `ProviderError` (502), a timeout is a
/// `ProviderTimeout` (504), and a bad request is the caller's fault, not the
/// provider's, so it maps to `Validation` (400) rather than 502.
impl From<AdapterError> for sn_common::SnError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Transient(m) | AdapterError::RateLimited(m) => sn_common::SnError::ProviderError(m),
            AdapterError::Timeout(m) => sn_common::SnError::ProviderTimeout(m),
            AdapterError::BadRequest(m) => sn_common::SnError::Validation(m),
        }
    }
}

/// Runs `f` up to 4 times total (1 + 3 retries), sleeping `BACKOFF[attempt]`
/// between attempts, stopping early on a non-retryable error or on success.
/// `label` is logged with each retry so operators can correlate adapter
/// flakiness with a specific call site.
pub async fn with_retry<T, F, Fut>(label: &str, mut f: F) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut last_err: Option<AdapterError> = None;
    for (attempt, delay) in std::iter::once(None).chain(BACKOFF.into_iter().map(Some)).enumerate() {
        if let Some(delay) = delay {
            tracing::warn!(adapter = label, attempt, ?delay, error = ?last_err, "retrying adapter call");
            tokio::time::sleep(delay).await;
        }
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let retryable = e.is_retryable();
                last_err = Some(e);
                if !retryable {
                    break;
                }
            }
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, AdapterError> = with_retry("test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AdapterError::Transient("boom".into()))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_bad_request() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AdapterError> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AdapterError::BadRequest("nope".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_four_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AdapterError> = with_retry("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AdapterError::Transient("still down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

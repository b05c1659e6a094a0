//! Shared `reqwest` plumbing: a client builder and the mapping from
//! `reqwest`/HTTP-status failures into [`AdapterError`].

use crate::retry::AdapterError;
use reqwest::{Response, StatusCode};
use std::time::Duration;

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("signal-noise/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("reqwest client configuration is valid")
}

pub fn map_reqwest_err(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout(e.to_string())
    } else {
        AdapterError::Transient(e.to_string())
    }
}

/// Maps a non-2xx response into the right `AdapterError` variant: 429 is
/// rate limiting, other 4xx are permanent bad requests, 5xx are transient.
pub async fn check_status(resp: Response) -> Result<Response, AdapterError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(AdapterError::RateLimited(format!("{status}: {body}")))
    } else if status.is_client_error() {
        Err(AdapterError::BadRequest(format!("{status}: {body}")))
    } else {
        Err(AdapterError::Transient(format!("{status}: {body}")))
    }
}

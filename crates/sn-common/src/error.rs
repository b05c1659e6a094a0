//! The single error taxonomy every crate converts into. See spec §7.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// The seven-member error taxonomy from spec §7, each with a single HTTP
/// status mapping.
#[derive(Debug, Error)]
pub enum SnError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("upstream provider failed: {0}")]
    ProviderError(String),

    #[error("upstream provider timed out: {0}")]
    ProviderTimeout(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SnResult<T> = std::result::Result<T, SnError>;

impl SnError {
    pub fn status(&self) -> StatusCode {
        match self {
            SnError::Validation(_) => StatusCode::BAD_REQUEST,
            SnError::NotFound(_) => StatusCode::NOT_FOUND,
            SnError::Conflict(_) => StatusCode::CONFLICT,
            SnError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            SnError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SnError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SnError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for SnError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

impl SnError {
    /// Postgres SQLSTATE 40001: a `REPEATABLE READ` transaction lost a
    /// serialization race (spec §4.7.6, §7 — retried up to 3 times with
    /// jitter by the caller of `commit_evidence`, never inside `Store`
    /// itself).
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, SnError::Conflict(msg) if msg.starts_with("serialization_failure:"))
    }
}

impl From<sqlx::Error> for SnError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => SnError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                SnError::Unavailable(format!("database unreachable: {e}"))
            }
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("40001") => {
                SnError::Conflict(format!("serialization_failure: {e}"))
            }
            _ => SnError::Internal(format!("database error: {e}")),
        }
    }
}

impl From<reqwest::Error> for SnError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SnError::ProviderTimeout(e.to_string())
        } else {
            SnError::ProviderError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SnError {
    fn from(e: serde_json::Error) -> Self {
        SnError::Validation(format!("malformed JSON: {e}"))
    }
}

impl From<anyhow::Error> for SnError {
    fn from(e: anyhow::Error) -> Self {
        SnError::Internal(e.to_string())
    }
}

//! `GET /healthz` and `GET /internal/metrics` (spec §6) — ambient ops
//! surface, not part of the analyst-facing API.

use crate::state::SharedState;
use axum::extract::State;
use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusHandle;

pub async fn healthz(State(state): State<SharedState>) -> StatusCode {
    match state.store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "healthz check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

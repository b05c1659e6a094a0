//! Shared application state, injected into every Axum handler (mirrors this
//! codebase's `AppState`/`SharedState` convention, `ferrumyx-web/src/state.rs`).

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;
use sn_config::AppConfig;
use sn_db::Store;
use sn_evidence::Engine;
use sn_queue::Queue;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn Queue>,
    pub engine: Engine,
    pub config: AppConfig,
    pub metrics_handle: PrometheusHandle,
}

pub type SharedState = Arc<AppState>;

/// Lets `ops::metrics` extract `State<PrometheusHandle>` directly out of the
/// shared `AppState`, without every other handler needing to know it exists.
impl FromRef<SharedState> for PrometheusHandle {
    fn from_ref(state: &SharedState) -> Self {
        state.metrics_handle.clone()
    }
}

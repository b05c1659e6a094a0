//! Ambient observability (SPEC_FULL.md §4.9): queue depth, job outcome
//! counters, and adapter latency histograms, exposed as Prometheus text
//! exposition at `GET /internal/metrics` (SPEC_FULL.md §6). This is not one
//! of spec.md's Non-goals — those exclude full-text/vector search, auth,
//! multi-tenancy and collaboration, not logging/metrics.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Installs the process-wide Prometheus recorder and returns the handle the
/// API binary's `/internal/metrics` route renders on each scrape. Call once
/// at startup, before any `metrics::counter!`/`gauge!`/`histogram!` call.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus recorder")
}

/// Records a worker job outcome, e.g. `record_job_outcome("ingestion", "completed")`.
pub fn record_job_outcome(job_kind: &'static str, outcome: &'static str) {
    metrics::counter!("sn_job_outcomes_total", "job_kind" => job_kind, "outcome" => outcome).increment(1);
}

/// Records the current depth of a queue right after a poll, e.g.
/// `record_queue_depth("ingestion", 0)` when `claim_next` returned nothing.
pub fn record_queue_claim(job_kind: &'static str, claimed: bool) {
    metrics::counter!("sn_queue_claims_total", "job_kind" => job_kind, "claimed" => claimed.to_string())
        .increment(1);
}

/// Records how long one external adapter call took, e.g.
/// `record_adapter_latency("openai_analyze", elapsed)`.
pub fn record_adapter_latency(adapter: &'static str, elapsed: Duration) {
    metrics::histogram!("sn_adapter_latency_seconds", "adapter" => adapter).record(elapsed.as_secs_f64());
}

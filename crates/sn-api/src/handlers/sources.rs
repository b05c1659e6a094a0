//! `GET /sources` (spec §6) and `POST /ingest-requests`, which enqueues an
//! ingestion job per source id.

use crate::dto::{IngestRequestsBody, IngestRequestsResponse, SourceDto};
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use sn_common::SnResult;

pub async fn list_sources(State(state): State<SharedState>) -> SnResult<Json<Vec<SourceDto>>> {
    let sources = state.store.list_sources().await?;
    Ok(Json(sources.into_iter().map(SourceDto::from).collect()))
}

/// spec §6 `POST /ingest-requests`: enqueues a job per source id, returning
/// the count of genuinely new insertions (spec S5 — a second call for the
/// same source while one is still `queued` contributes 0, not a duplicate
/// row).
pub async fn create_ingest_requests(
    State(state): State<SharedState>,
    Json(body): Json<IngestRequestsBody>,
) -> SnResult<Json<IngestRequestsResponse>> {
    let mut queued_jobs = 0usize;
    for source_id in body.source_ids {
        state.store.get_source(source_id).await?;
        let (_, newly_queued) = state.queue.enqueue_ingestion(source_id).await?;
        if newly_queued {
            queued_jobs += 1;
        }
    }
    Ok(Json(IngestRequestsResponse { queued_jobs }))
}

//! `POST /transcription-requests` (spec §6): enqueues a transcription job,
//! mirroring the ingestion enqueue path in `sources.rs` but for a single
//! document rather than a batch of sources.

use crate::dto::{CreateTranscriptionRequestBody, TranscriptionRequestDto};
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use sn_common::SnResult;
use sn_queue::NewTranscriptionRequest;

pub async fn create_transcription_request(
    State(state): State<SharedState>,
    Json(body): Json<CreateTranscriptionRequestBody>,
) -> SnResult<Json<TranscriptionRequestDto>> {
    state.store.get_document(body.document_id).await?;

    let request = state
        .queue
        .enqueue_transcription(NewTranscriptionRequest {
            document_id: body.document_id,
            provider: body.provider,
            model: body.model,
            start_seconds: body.start_seconds,
            end_seconds: body.end_seconds,
            metadata: serde_json::Value::Null,
        })
        .await?;

    Ok(Json(request.into()))
}

//! `GET/PATCH /documents*` (spec §6): listing active documents, archiving,
//! and reading content/segments.

use crate::dto::{DocumentContentDto, DocumentSummaryDto, SegmentDto};
use crate::state::SharedState;
use axum::extract::{Path, State};
use axum::Json;
use sn_common::SnResult;
use uuid::Uuid;

/// spec §6 `GET /documents`: only non-archived documents, each with its
/// segment count.
pub async fn list_documents(State(state): State<SharedState>) -> SnResult<Json<Vec<DocumentSummaryDto>>> {
    let rows = state.store.list_active_documents_with_segment_counts().await?;
    Ok(Json(rows.into_iter().map(|(doc, count)| DocumentSummaryDto::from_row(doc, count)).collect()))
}

pub async fn archive_document(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<DocumentSummaryDto>> {
    let doc = state.store.archive_document(id).await?;
    let segment_count = state.store.list_segments_for_document(id).await?.len() as i64;
    Ok(Json(DocumentSummaryDto::from_row(doc, segment_count)))
}

pub async fn get_document_content(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<DocumentContentDto>> {
    let doc = state.store.get_document(id).await?;
    Ok(Json(doc.into()))
}

pub async fn list_document_segments(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<Vec<SegmentDto>>> {
    // NotFound if the document itself doesn't exist, rather than silently
    // returning an empty list.
    state.store.get_document(id).await?;
    let segments = state.store.list_segments_for_document(id).await?;
    Ok(Json(segments.into_iter().map(SegmentDto::from).collect()))
}

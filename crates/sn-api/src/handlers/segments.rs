//! `GET/POST/DELETE /segments*` (spec §6), including the two evidence-engine
//! call-throughs (`:suggest`, `/evidence`) that make this the thickest
//! handler module in the crate.

use crate::dto::{
    self, CommitEvidenceBody, CommitEvidenceOutcomeDto, CreateSegmentBody, LinkDto, SegmentDto,
    SegmentSummaryDto, SegmentWorkbenchDto, SuggestionDto,
};
use crate::state::SharedState;
use crate::validation::{require_non_empty, validate_text_offsets};
use axum::extract::{Path, State};
use axum::Json;
use sn_common::enums::OffsetKind;
use sn_common::{SnError, SnResult};
use sn_db::store::{CommitEvidenceItem, NewSegment};
use uuid::Uuid;

pub async fn list_segments(State(state): State<SharedState>) -> SnResult<Json<Vec<SegmentSummaryDto>>> {
    let rows = state.store.list_segments().await?;
    Ok(Json(
        rows.into_iter()
            .map(|(segment, count)| SegmentSummaryDto {
                preview: dto::preview(&segment.text),
                linked_hypothesis_count: count,
                segment: segment.into(),
            })
            .collect(),
    ))
}

pub async fn get_segment(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<SegmentWorkbenchDto>> {
    let workbench = state.store.get_segment_workbench(id).await?;
    Ok(Json(workbench.into()))
}

/// spec §6 `POST /segments`, spec S1: creates a manual segment from a UI
/// selection, enforcing invariant 6 (spec §8) for `offset_kind=text`.
pub async fn create_segment(
    State(state): State<SharedState>,
    Json(body): Json<CreateSegmentBody>,
) -> SnResult<Json<SegmentDto>> {
    require_non_empty("text", &body.text)?;
    let document = state.store.get_document(body.document_id).await?;

    let offset_kind = body.offset_kind.unwrap_or(OffsetKind::Text);
    validate_text_offsets(body.start_offset, body.end_offset, offset_kind, document.content_text.as_deref())?;

    let segment = state
        .store
        .create_segment(NewSegment {
            document_id: body.document_id,
            text: body.text,
            content_html: body.content_html,
            start_offset: body.start_offset,
            end_offset: body.end_offset,
            offset_kind: Some(offset_kind),
            labels: body.labels,
            provenance: None,
        })
        .await?;

    Ok(Json(segment.into()))
}

pub async fn delete_segment(State(state): State<SharedState>, Path(id): Path<Uuid>) -> SnResult<()> {
    state.store.delete_segment(id).await
}

pub async fn list_segment_hypotheses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<Vec<LinkDto>>> {
    let links = state.engine.list_hypotheses_for_segment(id).await?;
    Ok(Json(links.into_iter().map(LinkDto::from).collect()))
}

/// spec §6 `POST /segments/{id}/hypotheses:suggest` → spec §4.7.1. No
/// writes — a pure read-through to the `Suggester`.
pub async fn suggest_hypotheses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<Vec<SuggestionDto>>> {
    let suggestions = state.engine.suggest(id).await?;
    Ok(Json(suggestions.into_iter().map(SuggestionDto::from).collect()))
}

/// spec §6 `POST /segments/{id}/evidence` → spec §4.7.3: the transactional
/// core. Validates `authored_by`/`verdict` shape at the API boundary, then
/// delegates the whole batch to the engine in one call — adapter I/O never
/// happens inside this handler, only pure data in, pure data out (spec §4.8).
pub async fn commit_evidence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CommitEvidenceBody>,
) -> SnResult<Json<Vec<CommitEvidenceOutcomeDto>>> {
    if body.items.is_empty() {
        return Err(SnError::Validation("evidence commit requires at least one item".to_string()));
    }

    let items = body
        .items
        .into_iter()
        .map(|item| {
            require_non_empty("hypothesis_text", &item.hypothesis_text)?;
            Ok(CommitEvidenceItem {
                hypothesis_id: item.hypothesis_id,
                hypothesis_text: item.hypothesis_text,
                description: item.description,
                verdict: item.verdict,
                analysis_text: item.analysis_text,
                authored_by: item.authored_by,
            })
        })
        .collect::<SnResult<Vec<_>>>()?;

    let outcomes = state.engine.commit_evidence(id, items).await?;
    Ok(Json(outcomes.into_iter().map(CommitEvidenceOutcomeDto::from).collect()))
}

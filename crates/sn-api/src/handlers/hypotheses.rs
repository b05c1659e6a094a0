//! `GET/POST/PATCH/DELETE /hypotheses*` (spec §6).

use crate::dto::{
    CreateHypothesisBody, EvidenceDto, HypothesisDto, HypothesisSummaryDto, ReferenceDto,
    UpdateHypothesisBody,
};
use crate::state::SharedState;
use crate::validation::require_non_empty;
use axum::extract::{Path, State};
use axum::Json;
use sn_common::enums::ReferenceType;
use sn_common::SnResult;
use sn_db::store::{HypothesisPatch, NewHypothesis};
use uuid::Uuid;

pub async fn list_hypotheses(State(state): State<SharedState>) -> SnResult<Json<Vec<HypothesisSummaryDto>>> {
    let rows = state.store.list_hypotheses().await?;
    Ok(Json(
        rows.into_iter()
            .map(|(hypothesis, evidence_count)| HypothesisSummaryDto {
                hypothesis: hypothesis.into(),
                evidence_count,
            })
            .collect(),
    ))
}

pub async fn create_hypothesis(
    State(state): State<SharedState>,
    Json(body): Json<CreateHypothesisBody>,
) -> SnResult<Json<HypothesisDto>> {
    require_non_empty("hypothesis_text", &body.hypothesis_text)?;
    let hypothesis = state
        .store
        .create_hypothesis(NewHypothesis {
            hypothesis_text: body.hypothesis_text,
            description: body.description,
            reference_url: body.reference_url,
            reference_type: body.reference_type.unwrap_or(ReferenceType::None),
        })
        .await?;
    Ok(Json(hypothesis.into()))
}

/// spec §6 `PATCH /hypotheses/{id}`: the double-`Option` body fields map
/// straight onto [`HypothesisPatch`] (spec S2 — any content-field change
/// snapshots a version and marks existing links `stale`).
pub async fn update_hypothesis(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateHypothesisBody>,
) -> SnResult<Json<HypothesisDto>> {
    if let Some(text) = &body.hypothesis_text {
        require_non_empty("hypothesis_text", text)?;
    }
    let hypothesis = state
        .store
        .update_hypothesis(
            id,
            HypothesisPatch {
                hypothesis_text: body.hypothesis_text,
                description: body.description,
                reference_url: body.reference_url,
                reference_type: body.reference_type,
                recorded_by: body.recorded_by,
            },
        )
        .await?;
    Ok(Json(hypothesis.into()))
}

pub async fn delete_hypothesis(State(state): State<SharedState>, Path(id): Path<Uuid>) -> SnResult<()> {
    state.store.delete_hypothesis(id).await
}

pub async fn list_hypothesis_evidence(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<Vec<EvidenceDto>>> {
    let rows = state.engine.list_evidence_for_hypothesis(id).await?;
    Ok(Json(rows.into_iter().map(EvidenceDto::from).collect()))
}

/// spec §6 `GET /hypotheses/{id}/reference` → spec §4.6 (C6 cache).
pub async fn get_reference(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<ReferenceDto>> {
    let reference_text = state.engine.get_reference(id).await?;
    let character_count = reference_text.as_ref().map(|t| t.chars().count() as i32);
    Ok(Json(ReferenceDto { hypothesis_id: id, reference_text, character_count }))
}

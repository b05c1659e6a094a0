//! `GET/POST/DELETE /questions*` (spec §6).

use crate::dto::{CreateQuestionBody, HypothesisDto, LinkQuestionHypothesisBody, QuestionDto};
use crate::state::SharedState;
use crate::validation::require_non_empty;
use axum::extract::{Path, State};
use axum::Json;
use sn_common::SnResult;
use uuid::Uuid;

pub async fn list_questions(State(state): State<SharedState>) -> SnResult<Json<Vec<QuestionDto>>> {
    let rows = state.store.list_questions().await?;
    Ok(Json(rows.into_iter().map(QuestionDto::from).collect()))
}

pub async fn create_question(
    State(state): State<SharedState>,
    Json(body): Json<CreateQuestionBody>,
) -> SnResult<Json<QuestionDto>> {
    require_non_empty("question_text", &body.question_text)?;
    let question = state.store.create_question(body.question_text).await?;
    Ok(Json(question.into()))
}

pub async fn delete_question(State(state): State<SharedState>, Path(id): Path<Uuid>) -> SnResult<()> {
    state.store.delete_question(id).await
}

pub async fn list_question_hypotheses(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> SnResult<Json<Vec<HypothesisDto>>> {
    let rows = state.store.list_hypotheses_for_question(id).await?;
    Ok(Json(rows.into_iter().map(HypothesisDto::from).collect()))
}

/// spec §6 `POST /questions/{id}/hypotheses`: 409 if the pair is already
/// linked (spec §7).
pub async fn link_question_hypothesis(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LinkQuestionHypothesisBody>,
) -> SnResult<()> {
    state.store.link_question_hypothesis(id, body.hypothesis_id).await
}

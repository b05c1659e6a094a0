//! `POST /analysis:check_hypothesis` and `POST /analysis:generate_pov`
//! (spec §6) — the two standalone-of-a-segment analysis entry points.

use crate::dto::{CheckHypothesisBody, CheckHypothesisResponse, GeneratePovResponse};
use crate::state::SharedState;
use crate::validation::require_non_empty;
use axum::extract::State;
use axum::Json;
use sn_common::SnResult;
use sn_evidence::AnalyzeParams;

/// spec §4.7.2: judges a segment/hypothesis pair outside the commit flow, so
/// the UI can preview a verdict before the user decides to save it as
/// evidence.
pub async fn check_hypothesis(
    State(state): State<SharedState>,
    Json(body): Json<CheckHypothesisBody>,
) -> SnResult<Json<CheckHypothesisResponse>> {
    require_non_empty("segment_text", &body.segment_text)?;
    require_non_empty("hypothesis_text", &body.hypothesis_text)?;

    let outcome = state
        .engine
        .analyze(AnalyzeParams {
            segment_text: body.segment_text,
            hypothesis_text: body.hypothesis_text,
            description: body.description,
            reference_url: body.reference_url,
            include_full_reference: body.include_full_reference,
            hypothesis_id: body.hypothesis_id,
        })
        .await?;

    Ok(Json(CheckHypothesisResponse {
        verdict: outcome.verdict,
        analysis_text: outcome.analysis_text,
        analysis_mode: outcome.analysis_mode,
    }))
}

/// Not yet implemented upstream (spec Open Question, resolved in DESIGN.md):
/// returns a well-typed "not implemented" body rather than a 404/500, so
/// clients can distinguish "this route doesn't exist" from "this route
/// exists but the feature isn't built yet".
pub async fn generate_pov() -> SnResult<Json<GeneratePovResponse>> {
    Ok(Json(GeneratePovResponse { status: "not_implemented", pov_text: None }))
}

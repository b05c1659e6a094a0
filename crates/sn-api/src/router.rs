//! Axum router — maps every path in spec §6 to its handler.

use crate::handlers::{analysis, documents, hypotheses, ops, questions, segments, sources, transcription};
use crate::state::{AppState, SharedState};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Builds the full router. `analyze_timeout`/`default_timeout` (spec §5)
/// are split across two sub-routers so the long-running analysis routes get
/// their own deadline without loosening it for everything else.
pub fn build_router(state: AppState) -> Router {
    let analyze_timeout = state.config.analyze_timeout;
    let default_timeout = state.config.default_timeout;
    let shared: SharedState = Arc::new(state);

    let analysis_routes = Router::new()
        .route("/analysis:check_hypothesis", post(analysis::check_hypothesis))
        .route("/analysis:generate_pov", post(analysis::generate_pov))
        .layer(TimeoutLayer::new(analyze_timeout));

    let default_routes = Router::new()
        .route("/sources", get(sources::list_sources))
        .route("/ingest-requests", post(sources::create_ingest_requests))
        .route("/documents", get(documents::list_documents))
        .route("/documents/{id}/archive", patch(documents::archive_document))
        .route("/documents/{id}/content", get(documents::get_document_content))
        .route("/documents/{id}/segments", get(documents::list_document_segments))
        .route("/segments", get(segments::list_segments).post(segments::create_segment))
        .route(
            "/segments/{id}",
            get(segments::get_segment).delete(segments::delete_segment),
        )
        .route("/segments/{id}/hypotheses", get(segments::list_segment_hypotheses))
        .route("/segments/{id}/hypotheses:suggest", post(segments::suggest_hypotheses))
        .route("/segments/{id}/evidence", post(segments::commit_evidence))
        .route("/hypotheses", get(hypotheses::list_hypotheses).post(hypotheses::create_hypothesis))
        .route(
            "/hypotheses/{id}",
            patch(hypotheses::update_hypothesis).delete(hypotheses::delete_hypothesis),
        )
        .route("/hypotheses/{id}/evidence", get(hypotheses::list_hypothesis_evidence))
        .route("/hypotheses/{id}/reference", get(hypotheses::get_reference))
        .route("/questions", get(questions::list_questions).post(questions::create_question))
        .route("/questions/{id}", delete(questions::delete_question))
        .route(
            "/questions/{id}/hypotheses",
            get(questions::list_question_hypotheses).post(questions::link_question_hypothesis),
        )
        .route(
            "/transcription-requests",
            post(transcription::create_transcription_request),
        )
        .layer(TimeoutLayer::new(default_timeout));

    let ops_routes = Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/internal/metrics", get(ops::metrics));

    Router::new()
        .merge(analysis_routes)
        .merge(default_routes)
        .merge(ops_routes)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

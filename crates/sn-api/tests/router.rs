//! Router-level tests (spec §8 scenarios): build the real axum app against
//! `FakeStore`/`FakeQueue` and a stub adapter trio, and drive it with
//! `tower::ServiceExt::oneshot` — no live Postgres or HTTP provider needed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sn_adapters::retry::AdapterError;
use sn_adapters::{
    AnalyzeRequest, AnalyzeResult, Analyzer, CrawlResult, Crawler, ExistingHypothesis,
    HypothesisSuggestion, Suggester,
};
use sn_api::state::AppState;
use sn_common::enums::{JobStatus, Verdict};
use sn_common::SnResult;
use sn_config::AppConfig;
use sn_db::models::{IngestionRequest, TranscriptionRequest};
use sn_evidence::Engine;
use sn_queue::{NewTranscriptionRequest, Queue};
use sn_test_utils::builders::{a_document, a_segment, a_source};
use sn_test_utils::FakeStore;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct FakeQueue {
    ingestion_seen: AsyncMutex<Vec<Uuid>>,
    transcription_seen: AsyncMutex<Vec<NewTranscriptionRequest>>,
}

#[async_trait]
impl Queue for FakeQueue {
    async fn enqueue_ingestion(&self, source_id: Uuid) -> SnResult<(IngestionRequest, bool)> {
        let mut seen = self.ingestion_seen.lock().await;
        let newly = !seen.contains(&source_id);
        if newly {
            seen.push(source_id);
        }
        let now = chrono::Utc::now();
        Ok((
            IngestionRequest {
                id: Uuid::new_v4(),
                source_id,
                status: JobStatus::Queued,
                error_message: None,
                created_at: now,
                updated_at: now,
            },
            newly,
        ))
    }

    async fn claim_next_ingestion(&self) -> SnResult<Option<IngestionRequest>> {
        unimplemented!("not exercised by these tests")
    }
    async fn complete_ingestion(&self, _id: Uuid) -> SnResult<()> {
        unimplemented!("not exercised by these tests")
    }
    async fn fail_ingestion(&self, _id: Uuid, _error_message: String) -> SnResult<()> {
        unimplemented!("not exercised by these tests")
    }

    async fn enqueue_transcription(&self, new: NewTranscriptionRequest) -> SnResult<TranscriptionRequest> {
        let now = chrono::Utc::now();
        let row = TranscriptionRequest {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            provider: new.provider,
            model: new.model.clone(),
            start_seconds: new.start_seconds,
            end_seconds: new.end_seconds,
            status: JobStatus::Pending,
            result_text: None,
            metadata: new.metadata.clone(),
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.transcription_seen.lock().await.push(new);
        Ok(row)
    }
    async fn claim_next_transcription(&self) -> SnResult<Option<TranscriptionRequest>> {
        unimplemented!("not exercised by these tests")
    }
    async fn complete_transcription(&self, _id: Uuid, _result_text: Option<String>) -> SnResult<()> {
        unimplemented!("not exercised by these tests")
    }
    async fn fail_transcription(&self, _id: Uuid, _error_message: String) -> SnResult<()> {
        unimplemented!("not exercised by these tests")
    }
}

struct StubSuggester(VecDeque<HypothesisSuggestion>);
#[async_trait]
impl Suggester for StubSuggester {
    async fn suggest_hypotheses(
        &self,
        _segment_text: &str,
        _existing: &[ExistingHypothesis],
    ) -> Result<Vec<HypothesisSuggestion>, AdapterError> {
        Ok(self.0.iter().cloned().collect())
    }
}

struct StubAnalyzer(Verdict);
#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, _req: AnalyzeRequest<'_>) -> Result<AnalyzeResult, AdapterError> {
        Ok(AnalyzeResult { verdict: self.0, analysis_text: "because the text says so".to_string() })
    }
}

struct StubCrawler;
#[async_trait]
impl Crawler for StubCrawler {
    async fn fetch_text(&self, _url: &str) -> Result<CrawlResult, AdapterError> {
        Ok(CrawlResult { full_text: "full reference body".to_string(), char_count: 19 })
    }
}

fn test_config() -> AppConfig {
    std::env::set_var("DATABASE_URL", "postgres://unused/unused");
    AppConfig::from_env().unwrap()
}

async fn build_app(store: FakeStore) -> (axum::Router, FakeStore) {
    let queue = Arc::new(FakeQueue::default());
    let store_arc: Arc<dyn sn_db::Store> = Arc::new(store.clone());
    let engine = Engine::new(
        store_arc.clone(),
        Arc::new(StubSuggester(VecDeque::new())),
        Arc::new(StubAnalyzer(Verdict::Confirms)),
        Arc::new(StubCrawler),
    );
    // A plain recorder/handle pair, not the process-global one
    // `sn_supervisor::metrics::install_recorder` installs — tests build
    // many `AppState`s in one binary and a second global install panics.
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle();
    let state =
        AppState { store: store_arc, queue, engine, config: test_config(), metrics_handle };
    (sn_api::build_router(state), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// spec S1: manually carving a segment from a document.
#[tokio::test]
async fn create_segment_then_list_returns_it() {
    let store = FakeStore::new();
    let source = a_source("feed");
    store.seed_source(source.clone()).await;
    let document = a_document(source.id, "ABCDEFGHIJ");
    store.seed_document(document.clone()).await;
    let (app, _store) = build_app(store).await;

    let body = json!({
        "document_id": document.id,
        "text": "DEF",
        "start_offset": 3,
        "end_offset": 6,
    });
    let response = app
        .clone()
        .oneshot(
            Request::post("/segments")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let segment_id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(Request::get("/segments").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"].as_str().unwrap(), segment_id);
}

/// Invariant 6: an out-of-range text offset is a 400, not a 500 or a silent
/// clamp.
#[tokio::test]
async fn create_segment_rejects_offsets_past_content_length() {
    let store = FakeStore::new();
    let source = a_source("feed");
    store.seed_source(source.clone()).await;
    let document = a_document(source.id, "short");
    store.seed_document(document.clone()).await;
    let (app, _store) = build_app(store).await;

    let body = json!({
        "document_id": document.id,
        "text": "anything",
        "start_offset": 0,
        "end_offset": 9000,
    });
    let response = app
        .oneshot(
            Request::post("/segments")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// spec S2: committing evidence with a null `hypothesis_id` creates a new
/// hypothesis and a current link in one call.
#[tokio::test]
async fn commit_evidence_creates_hypothesis_and_link() {
    let store = FakeStore::new();
    let source = a_source("feed");
    store.seed_source(source.clone()).await;
    let document = a_document(source.id, "ABCDEFGHIJ");
    store.seed_document(document.clone()).await;
    let segment = a_segment(document.id, "DEF", 3, 6);
    store.seed_segment(segment.clone()).await;
    let (app, _store) = build_app(store).await;

    let body = json!({
        "items": [{
            "hypothesis_id": null,
            "hypothesis_text": "claim about DEF",
            "verdict": "confirms",
            "analysis_text": "matches",
            "authored_by": "human",
        }]
    });
    let response = app
        .oneshot(
            Request::post(format!("/segments/{}/evidence", segment.id))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcomes = body_json(response).await;
    assert_eq!(outcomes.as_array().unwrap().len(), 1);
    assert!(outcomes[0]["hypothesis_created"].as_bool().unwrap());
    assert_eq!(outcomes[0]["link"]["verdict"], "confirms");
}

/// spec S4: a second ingest request for a source that's still `queued`
/// contributes 0 to `queued_jobs`.
#[tokio::test]
async fn ingest_requests_are_idempotent_per_source() {
    let store = FakeStore::new();
    let source = a_source("feed");
    store.seed_source(source.clone()).await;
    let (app, _store) = build_app(store).await;

    let body = json!({ "source_ids": [source.id] });
    let first = app
        .clone()
        .oneshot(
            Request::post("/ingest-requests")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(first).await["queued_jobs"], 1);

    let second = app
        .oneshot(
            Request::post("/ingest-requests")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(second).await["queued_jobs"], 0);
}

#[tokio::test]
async fn check_hypothesis_returns_summary_mode_without_reference() {
    let store = FakeStore::new();
    let (app, _store) = build_app(store).await;

    let body = json!({
        "segment_text": "DEF",
        "hypothesis_text": "claim",
    });
    let response = app
        .oneshot(
            Request::post("/analysis:check_hypothesis")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["analysis_mode"], "summary");
    assert_eq!(parsed["verdict"], "confirms");
}

#[tokio::test]
async fn generate_pov_reports_not_implemented() {
    let store = FakeStore::new();
    let (app, _store) = build_app(store).await;

    let response = app
        .oneshot(
            Request::post("/analysis:generate_pov")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["status"], "not_implemented");
}

#[tokio::test]
async fn get_document_returns_404_for_unknown_id() {
    let store = FakeStore::new();
    let (app, _store) = build_app(store).await;

    let response = app
        .oneshot(
            Request::get(format!("/documents/{}/content", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_transcription_request_enqueues_job() {
    let store = FakeStore::new();
    let source = a_source("feed");
    store.seed_source(source.clone()).await;
    let document = a_document(source.id, "body");
    store.seed_document(document.clone()).await;
    let (app, _store) = build_app(store).await;

    let body = json!({
        "document_id": document.id,
        "provider": "openai",
    });
    let response = app
        .oneshot(
            Request::post("/transcription-requests")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = body_json(response).await;
    assert_eq!(parsed["document_id"], document.id.to_string());
    assert_eq!(parsed["provider"], "openai");
}

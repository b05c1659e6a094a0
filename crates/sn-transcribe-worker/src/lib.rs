//! The transcription worker's job body (spec §4.5), factored out of
//! `main.rs` so it can be driven by [`sn_test_utils::FakeStore`] without a
//! poll loop or a live Postgres instance. Same poll-loop shape as
//! `sn-ingest-worker`; the job body differs in what it resolves and writes.

use sn_adapters::transcriber::{TranscribeRequest, Transcriber};
use sn_common::enums::{JobStatus, TranscriptStatus, TranscriptionProvider};
use sn_common::{SnError, SnResult};
use sn_db::models::{Document, DocumentAsset, TranscriptionRequest};
use sn_db::Store;
use sn_queue::Queue;
use std::sync::Arc;

/// Picks the transcriber for a job's `provider`.
fn select_transcriber(
    provider: TranscriptionProvider,
    openai: &Arc<dyn Transcriber>,
    assembly: &Arc<dyn Transcriber>,
) -> Arc<dyn Transcriber> {
    match provider {
        TranscriptionProvider::Openai => openai.clone(),
        TranscriptionProvider::Assembly => assembly.clone(),
    }
}

/// Finds the document's audio asset URL (spec §4.5 step 1: "resolve the
/// document's audio asset URL"). The first asset of type `audio` wins;
/// documents carry at most one in practice (podcast/RSS ingestion emits a
/// single enclosure).
fn audio_url(document: &Document) -> SnResult<&str> {
    document
        .assets
        .iter()
        .find(|a| a.asset_type == "audio")
        .map(|a| a.url.as_str())
        .ok_or_else(|| SnError::Validation(format!("document {} has no audio asset", document.id)))
}

/// Claims the next `transcription_request`, if any, runs it to completion,
/// and records the outcome. Returns `Ok(true)` if a job was claimed
/// (whether it succeeded or failed), `Ok(false)` if the queue was empty.
pub async fn process_next_job(
    store: &dyn Store,
    queue: &dyn Queue,
    openai: &Arc<dyn Transcriber>,
    assembly: &Arc<dyn Transcriber>,
) -> SnResult<bool> {
    let Some(job) = queue.claim_next_transcription().await? else {
        return Ok(false);
    };

    match run_transcription(store, openai, assembly, &job).await {
        Ok(text) => {
            tracing::info!(job_id = %job.id, document_id = %job.document_id, chars = text.len(), "transcription job completed");
            queue.complete_transcription(job.id, Some(text)).await?;
        }
        Err(e) => {
            // spec §4.3: a RateLimited/Transient signal is surfaced as a
            // failed job with a one-line error; the raw audio URL stays on
            // the document asset list for an operator-triggered retry.
            tracing::warn!(job_id = %job.id, document_id = %job.document_id, error = %e, "transcription job failed");
            queue.fail_transcription(job.id, e.to_string()).await?;
        }
    }

    Ok(true)
}

async fn run_transcription(
    store: &dyn Store,
    openai: &Arc<dyn Transcriber>,
    assembly: &Arc<dyn Transcriber>,
    job: &TranscriptionRequest,
) -> SnResult<String> {
    let document = store.get_document(job.document_id).await?;
    let url = audio_url(&document)?;

    let transcriber = select_transcriber(job.provider, openai, assembly);
    let result = transcriber
        .transcribe(TranscribeRequest {
            audio_url: url,
            start_seconds: job.start_seconds,
            end_seconds: job.end_seconds,
            model: job.model.as_deref(),
        })
        .await?;

    let is_full_window = job.start_seconds.is_none() && job.end_seconds.is_none();
    let status = if is_full_window { TranscriptStatus::Complete } else { TranscriptStatus::Partial };
    let full_text = if is_full_window { Some(result.text.clone()) } else { None };

    let asset = DocumentAsset {
        asset_type: "transcript".to_string(),
        url: url.to_string(),
        duration: None,
        start_seconds: job.start_seconds,
        end_seconds: job.end_seconds,
        text: Some(result.text.clone()),
        provider: Some(job.provider.as_str().to_string()),
    };

    store.append_transcript_asset(document.id, asset, full_text, status).await?;

    Ok(result.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sn_adapters::retry::AdapterError;
    use sn_test_utils::builders::a_source;
    use sn_test_utils::FakeStore;
    use std::collections::VecDeque;
    use tokio::sync::Mutex as AsyncMutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeQueue {
        pending: AsyncMutex<VecDeque<TranscriptionRequest>>,
        outcomes: AsyncMutex<Vec<(Uuid, JobStatus, Option<String>)>>,
    }

    impl FakeQueue {
        fn new() -> Self {
            Self::default()
        }

        async fn enqueue(&self, job: TranscriptionRequest) {
            self.pending.lock().await.push_back(job);
        }
    }

    #[async_trait]
    impl Queue for FakeQueue {
        async fn enqueue_ingestion(&self, _source_id: Uuid) -> SnResult<(sn_db::models::IngestionRequest, bool)> {
            unimplemented!("not exercised by these tests")
        }

        async fn claim_next_ingestion(&self) -> SnResult<Option<sn_db::models::IngestionRequest>> {
            unimplemented!("not exercised by these tests")
        }

        async fn complete_ingestion(&self, _id: Uuid) -> SnResult<()> {
            unimplemented!("not exercised by these tests")
        }

        async fn fail_ingestion(&self, _id: Uuid, _error_message: String) -> SnResult<()> {
            unimplemented!("not exercised by these tests")
        }

        async fn enqueue_transcription(
            &self,
            _new: sn_queue::NewTranscriptionRequest,
        ) -> SnResult<TranscriptionRequest> {
            unimplemented!("not exercised by these tests")
        }

        async fn claim_next_transcription(&self) -> SnResult<Option<TranscriptionRequest>> {
            Ok(self.pending.lock().await.pop_front())
        }

        async fn complete_transcription(&self, id: Uuid, result_text: Option<String>) -> SnResult<()> {
            self.outcomes.lock().await.push((id, JobStatus::Completed, result_text));
            Ok(())
        }

        async fn fail_transcription(&self, id: Uuid, error_message: String) -> SnResult<()> {
            self.outcomes.lock().await.push((id, JobStatus::Failed, Some(error_message)));
            Ok(())
        }
    }

    fn a_job(document_id: Uuid, start_seconds: Option<f64>, end_seconds: Option<f64>) -> TranscriptionRequest {
        let now = chrono::Utc::now();
        TranscriptionRequest {
            id: Uuid::new_v4(),
            document_id,
            provider: TranscriptionProvider::Openai,
            model: None,
            start_seconds,
            end_seconds,
            status: JobStatus::Pending,
            result_text: None,
            metadata: serde_json::json!({}),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct StubTranscriber {
        text: String,
        fail: bool,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(
            &self,
            _req: TranscribeRequest<'_>,
        ) -> Result<sn_adapters::transcriber::TranscribeResult, AdapterError> {
            if self.fail {
                return Err(AdapterError::RateLimited("provider backpressure".to_string()));
            }
            Ok(sn_adapters::transcriber::TranscribeResult {
                text: self.text.clone(),
                metadata: serde_json::json!({}),
            })
        }
    }

    async fn seed_document_with_audio(store: &FakeStore) -> Document {
        let source = a_source("podcast-feed");
        store.seed_source(source.clone()).await;
        let mut doc = sn_test_utils::builders::a_document(source.id, "");
        doc.assets.push(DocumentAsset {
            asset_type: "audio".to_string(),
            url: "https://example.com/ep1.mp3".to_string(),
            duration: Some(3600.0),
            start_seconds: None,
            end_seconds: None,
            text: None,
            provider: None,
        });
        store.seed_document(doc.clone()).await;
        doc
    }

    #[tokio::test]
    async fn full_window_sets_content_text_and_complete_status() {
        let store = FakeStore::new();
        let document = seed_document_with_audio(&store).await;
        let queue = FakeQueue::new();
        queue.enqueue(a_job(document.id, None, None)).await;

        let openai: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: "full transcript".into(), fail: false });
        let assembly: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: false });

        let claimed = process_next_job(&store, &queue, &openai, &assembly).await.unwrap();
        assert!(claimed);

        let updated = store.get_document(document.id).await.unwrap();
        assert_eq!(updated.content_text.as_deref(), Some("full transcript"));
        assert_eq!(updated.transcript_status, TranscriptStatus::Complete);
        assert_eq!(updated.assets.len(), 2);
    }

    #[tokio::test]
    async fn windowed_run_only_appends_asset_and_sets_partial() {
        let store = FakeStore::new();
        let document = seed_document_with_audio(&store).await;
        let queue = FakeQueue::new();
        queue.enqueue(a_job(document.id, Some(0.0), Some(60.0))).await;

        let openai: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: "first minute".into(), fail: false });
        let assembly: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: false });

        process_next_job(&store, &queue, &openai, &assembly).await.unwrap();

        let updated = store.get_document(document.id).await.unwrap();
        assert_eq!(updated.content_text, None);
        assert_eq!(updated.transcript_status, TranscriptStatus::Partial);
        assert_eq!(updated.assets.len(), 2);
    }

    #[tokio::test]
    async fn accumulates_multiple_windowed_assets_without_deleting_prior_ones() {
        let store = FakeStore::new();
        let document = seed_document_with_audio(&store).await;
        let queue = FakeQueue::new();
        queue.enqueue(a_job(document.id, Some(0.0), Some(60.0))).await;
        queue.enqueue(a_job(document.id, Some(60.0), Some(120.0))).await;

        let openai: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: "chunk".into(), fail: false });
        let assembly: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: false });

        process_next_job(&store, &queue, &openai, &assembly).await.unwrap();
        process_next_job(&store, &queue, &openai, &assembly).await.unwrap();

        let updated = store.get_document(document.id).await.unwrap();
        assert_eq!(updated.assets.len(), 3);
    }

    #[tokio::test]
    async fn provider_failure_fails_job_and_leaves_document_untouched() {
        let store = FakeStore::new();
        let document = seed_document_with_audio(&store).await;
        let queue = FakeQueue::new();
        queue.enqueue(a_job(document.id, None, None)).await;

        let openai: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: true });
        let assembly: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: false });

        process_next_job(&store, &queue, &openai, &assembly).await.unwrap();

        let untouched = store.get_document(document.id).await.unwrap();
        assert_eq!(untouched.assets.len(), 1);
        assert_eq!(untouched.transcript_status, TranscriptStatus::None);

        let outcomes = queue.outcomes.lock().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].1, JobStatus::Failed);
    }

    #[tokio::test]
    async fn missing_audio_asset_fails_with_validation_error() {
        let store = FakeStore::new();
        let source = a_source("no-audio");
        store.seed_source(source.clone()).await;
        let document = sn_test_utils::builders::a_document(source.id, "text only");
        store.seed_document(document.clone()).await;
        let queue = FakeQueue::new();
        queue.enqueue(a_job(document.id, None, None)).await;

        let openai: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: "x".into(), fail: false });
        let assembly: Arc<dyn Transcriber> = Arc::new(StubTranscriber { text: String::new(), fail: false });

        process_next_job(&store, &queue, &openai, &assembly).await.unwrap();
        let outcomes = queue.outcomes.lock().await;
        assert_eq!(outcomes[0].1, JobStatus::Failed);
    }
}

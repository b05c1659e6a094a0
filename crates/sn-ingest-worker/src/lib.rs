//! The ingestion worker's job body, factored out of `main.rs` so it can be
//! driven by [`sn_test_utils::FakeStore`] without a poll loop or a live
//! Postgres instance.

use sn_adapters::ingestor::Ingestor;
use sn_common::enums::SourceType;
use sn_common::SnResult;
use sn_db::store::Store;
use sn_queue::Queue;
use std::sync::Arc;
use uuid::Uuid;

/// Picks the ingestor for a source's `source_type`. `Manual` sources are
/// never queued for ingestion by the API, so a manual row reaching here is a
/// bug rather than a job outcome — it's mapped to `Ok(0)` so the job is
/// marked complete instead of endlessly retried.
fn select_ingestor(source_type: SourceType, rss: &Arc<dyn Ingestor>, podcast: &Arc<dyn Ingestor>) -> Option<Arc<dyn Ingestor>> {
    match source_type {
        SourceType::Rss => Some(rss.clone()),
        SourceType::Podcast => Some(podcast.clone()),
        SourceType::Manual => None,
    }
}

/// Claims the next queued `ingestion_request`, if any, runs it to completion,
/// and records the outcome on the job row. Returns `Ok(true)` if a job was
/// claimed (whether it succeeded or failed), `Ok(false)` if the queue was
/// empty — the caller uses this to decide whether to record a queue-depth
/// metric.
pub async fn process_next_job(
    store: &dyn Store,
    queue: &dyn Queue,
    rss: &Arc<dyn Ingestor>,
    podcast: &Arc<dyn Ingestor>,
) -> SnResult<bool> {
    let Some(job) = queue.claim_next_ingestion().await? else {
        return Ok(false);
    };

    match run_ingestion(store, rss, podcast, job.source_id).await {
        Ok(count) => {
            tracing::info!(job_id = %job.id, source_id = %job.source_id, documents = count, "ingestion job completed");
            queue.complete_ingestion(job.id).await?;
        }
        Err(e) => {
            tracing::warn!(job_id = %job.id, source_id = %job.source_id, error = %e, "ingestion job failed");
            queue.fail_ingestion(job.id, e.to_string()).await?;
        }
    }

    Ok(true)
}

async fn run_ingestion(
    store: &dyn Store,
    rss: &Arc<dyn Ingestor>,
    podcast: &Arc<dyn Ingestor>,
    source_id: Uuid,
) -> SnResult<usize> {
    let source = store.get_source(source_id).await?;

    let Some(ingestor) = select_ingestor(source.source_type, rss, podcast) else {
        return Ok(0);
    };

    let documents = ingestor.ingest(&source).await?;
    let count = documents.len();

    for doc in documents {
        store.upsert_document(doc).await?;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sn_adapters::retry::AdapterError;
    use sn_common::enums::JobStatus;
    use sn_db::models::IngestionRequest;
    use sn_db::store::NewDocument;
    use sn_test_utils::builders::a_source;
    use sn_test_utils::FakeStore;
    use std::collections::VecDeque;
    use tokio::sync::Mutex as AsyncMutex;

    /// Single-job in-memory [`Queue`], just enough to drive
    /// [`process_next_job`] without touching Postgres.
    #[derive(Default)]
    struct FakeQueue {
        pending: AsyncMutex<VecDeque<IngestionRequest>>,
        outcomes: AsyncMutex<Vec<(Uuid, JobStatus, Option<String>)>>,
    }

    impl FakeQueue {
        fn new() -> Self {
            Self::default()
        }

        async fn enqueue(&self, source_id: Uuid) {
            let now = chrono::Utc::now();
            self.pending.lock().await.push_back(IngestionRequest {
                id: Uuid::new_v4(),
                source_id,
                status: JobStatus::Queued,
                error_message: None,
                created_at: now,
                updated_at: now,
            });
        }
    }

    #[async_trait]
    impl Queue for FakeQueue {
        async fn enqueue_ingestion(&self, _source_id: Uuid) -> SnResult<(IngestionRequest, bool)> {
            unimplemented!("not exercised by these tests")
        }

        async fn claim_next_ingestion(&self) -> SnResult<Option<IngestionRequest>> {
            Ok(self.pending.lock().await.pop_front())
        }

        async fn complete_ingestion(&self, id: Uuid) -> SnResult<()> {
            self.outcomes.lock().await.push((id, JobStatus::Completed, None));
            Ok(())
        }

        async fn fail_ingestion(&self, id: Uuid, error_message: String) -> SnResult<()> {
            self.outcomes.lock().await.push((id, JobStatus::Failed, Some(error_message)));
            Ok(())
        }

        async fn enqueue_transcription(
            &self,
            _new: sn_queue::NewTranscriptionRequest,
        ) -> SnResult<sn_db::models::TranscriptionRequest> {
            unimplemented!("not exercised by these tests")
        }

        async fn claim_next_transcription(&self) -> SnResult<Option<sn_db::models::TranscriptionRequest>> {
            unimplemented!("not exercised by these tests")
        }

        async fn complete_transcription(&self, _id: Uuid, _result_text: Option<String>) -> SnResult<()> {
            unimplemented!("not exercised by these tests")
        }

        async fn fail_transcription(&self, _id: Uuid, _error_message: String) -> SnResult<()> {
            unimplemented!("not exercised by these tests")
        }
    }

    struct StubIngestor {
        source_type: SourceType,
        documents: Vec<String>,
    }

    #[async_trait]
    impl Ingestor for StubIngestor {
        async fn ingest(&self, source: &sn_db::models::Source) -> Result<Vec<NewDocument>, AdapterError> {
            assert_eq!(source.source_type, self.source_type);
            Ok(self
                .documents
                .iter()
                .map(|external_id| NewDocument {
                    source_id: source.id,
                    external_id: external_id.clone(),
                    title: Some(format!("doc {external_id}")),
                    author: None,
                    published_at: None,
                    original_url: None,
                    original_media_type: Some("text/html".to_string()),
                    content_text: Some("body".to_string()),
                    content_html: None,
                    assets: Vec::new(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn claims_ingests_and_upserts_documents() {
        let store = FakeStore::new();
        let queue = FakeQueue::new();
        let source = a_source("feed");
        store.seed_source(source.clone()).await;
        queue.enqueue(source.id).await;

        let rss: Arc<dyn Ingestor> =
            Arc::new(StubIngestor { source_type: SourceType::Rss, documents: vec!["a".into(), "b".into()] });
        let podcast: Arc<dyn Ingestor> = Arc::new(StubIngestor { source_type: SourceType::Podcast, documents: vec![] });

        let claimed = process_next_job(&store, &queue, &rss, &podcast).await.unwrap();
        assert!(claimed);
        assert_eq!(store.document_count_for_source(source.id).await, 2);

        let claimed_again = process_next_job(&store, &queue, &rss, &podcast).await.unwrap();
        assert!(!claimed_again);
    }

    #[tokio::test]
    async fn manual_source_is_skipped_without_failing() {
        let store = FakeStore::new();
        let queue = FakeQueue::new();
        let mut source = a_source("manual-feed");
        source.source_type = SourceType::Manual;
        source.feed_url = None;
        store.seed_source(source.clone()).await;
        queue.enqueue(source.id).await;

        let rss: Arc<dyn Ingestor> = Arc::new(StubIngestor { source_type: SourceType::Rss, documents: vec![] });
        let podcast: Arc<dyn Ingestor> = Arc::new(StubIngestor { source_type: SourceType::Podcast, documents: vec![] });

        let claimed = process_next_job(&store, &queue, &rss, &podcast).await.unwrap();
        assert!(claimed);
        assert_eq!(store.document_count_for_source(source.id).await, 0);
    }
}

//! The job queue: `ingestion_request` and `transcription_request`, each
//! claimed with `FOR UPDATE SKIP LOCKED` so N workers never double-process
//! the same row — queue rows are the only shared-write hot spot between
//! workers.

use async_trait::async_trait;
use serde_json::Value as Json;
use sn_common::SnResult;
use sn_db::models::{IngestionRequest, TranscriptionRequest};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewTranscriptionRequest {
    pub document_id: Uuid,
    pub provider: sn_common::enums::TranscriptionProvider,
    pub model: Option<String>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub metadata: Json,
}

#[async_trait]
pub trait Queue: Send + Sync {
    /// Idempotent: returns the existing `queued` row for this source
    /// without inserting if one already exists. The `bool` is `true` only
    /// when a new row was actually inserted, so callers (spec §6
    /// `POST /ingest-requests`) can count genuinely new jobs rather than
    /// every request.
    async fn enqueue_ingestion(&self, source_id: Uuid) -> SnResult<(IngestionRequest, bool)>;
    async fn claim_next_ingestion(&self) -> SnResult<Option<IngestionRequest>>;
    async fn complete_ingestion(&self, id: Uuid) -> SnResult<()>;
    async fn fail_ingestion(&self, id: Uuid, error_message: String) -> SnResult<()>;

    async fn enqueue_transcription(&self, new: NewTranscriptionRequest) -> SnResult<TranscriptionRequest>;
    async fn claim_next_transcription(&self) -> SnResult<Option<TranscriptionRequest>>;
    async fn complete_transcription(&self, id: Uuid, result_text: Option<String>) -> SnResult<()>;
    async fn fail_transcription(&self, id: Uuid, error_message: String) -> SnResult<()>;
}

/// PostgreSQL-backed [`Queue`].
#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
}

impl PgQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_transcription_request(row: &sqlx::postgres::PgRow) -> SnResult<TranscriptionRequest> {
    use sqlx::Row;
    Ok(TranscriptionRequest {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        provider: row.try_get("provider")?,
        model: row.try_get("model")?,
        start_seconds: row.try_get("start_seconds")?,
        end_seconds: row.try_get("end_seconds")?,
        status: row.try_get("status")?,
        result_text: row.try_get("result_text")?,
        metadata: row.try_get("metadata")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl Queue for PgQueue {
    async fn enqueue_ingestion(&self, source_id: Uuid) -> SnResult<(IngestionRequest, bool)> {
        let inserted = sqlx::query_as::<_, IngestionRequest>(
            r#"
            INSERT INTO ingestion_request (source_id)
            VALUES ($1)
            ON CONFLICT (source_id) WHERE status = 'queued' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok((row, true)),
            None => {
                let existing = sqlx::query_as::<_, IngestionRequest>(
                    "SELECT * FROM ingestion_request WHERE source_id = $1 AND status = 'queued' LIMIT 1",
                )
                .bind(source_id)
                .fetch_one(&self.pool)
                .await?;
                Ok((existing, false))
            }
        }
    }

    async fn claim_next_ingestion(&self) -> SnResult<Option<IngestionRequest>> {
        let row = sqlx::query_as::<_, IngestionRequest>(
            r#"
            UPDATE ingestion_request
            SET status = 'in_progress', updated_at = now()
            WHERE id = (
                SELECT id FROM ingestion_request
                WHERE status = 'queued'
                ORDER BY created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn complete_ingestion(&self, id: Uuid) -> SnResult<()> {
        sqlx::query("UPDATE ingestion_request SET status = 'completed', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail_ingestion(&self, id: Uuid, error_message: String) -> SnResult<()> {
        sqlx::query(
            "UPDATE ingestion_request SET status = 'failed', error_message = $1, updated_at = now() WHERE id = $2",
        )
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enqueue_transcription(&self, new: NewTranscriptionRequest) -> SnResult<TranscriptionRequest> {
        let row = sqlx::query(
            r#"
            INSERT INTO transcription_request
                (document_id, provider, model, start_seconds, end_seconds, metadata)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(new.document_id)
        .bind(new.provider)
        .bind(&new.model)
        .bind(new.start_seconds)
        .bind(new.end_seconds)
        .bind(&new.metadata)
        .fetch_one(&self.pool)
        .await?;
        row_to_transcription_request(&row)
    }

    async fn claim_next_transcription(&self) -> SnResult<Option<TranscriptionRequest>> {
        let row = sqlx::query(
            r#"
            UPDATE transcription_request
            SET status = 'in_progress', updated_at = now()
            WHERE id = (
                SELECT id FROM transcription_request
                WHERE status = 'pending'
                ORDER BY created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_transcription_request).transpose()
    }

    async fn complete_transcription(&self, id: Uuid, result_text: Option<String>) -> SnResult<()> {
        sqlx::query(
            "UPDATE transcription_request SET status = 'completed', result_text = $1, updated_at = now() WHERE id = $2",
        )
        .bind(result_text)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_transcription(&self, id: Uuid, error_message: String) -> SnResult<()> {
        sqlx::query(
            "UPDATE transcription_request SET status = 'failed', error_message = $1, updated_at = now() WHERE id = $2",
        )
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

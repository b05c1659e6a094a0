//! PostgreSQL implementation of [`crate::Store`].
//!
//! Row types with a `jsonb` column (`Document`, `Segment`,
//! `TranscriptionRequest`) are assembled by hand from a `PgRow` rather than
//! via `#[derive(FromRow)]`; everything else uses `sqlx::query_as`.

use crate::models::*;
use crate::store::{
    CommitEvidenceItem, CommitEvidenceOutcome, HypothesisPatch, NewDocument, NewHypothesis,
    NewSegment, ReferenceCacheLock, Store,
};
use async_trait::async_trait;
use serde_json::Value as Json;
use sn_common::enums::{TranscriptStatus, Verdict};
use sn_common::{SnError, SnResult};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Expose the underlying pool for `sn-queue`, which owns the
    /// ingestion/transcription job tables directly.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_document(row: &PgRow) -> SnResult<Document> {
    let assets_json: Json = row.try_get("assets")?;
    let assets: Vec<DocumentAsset> = serde_json::from_value(assets_json)?;
    Ok(Document {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        published_at: row.try_get("published_at")?,
        original_url: row.try_get("original_url")?,
        original_media_type: row.try_get("original_media_type")?,
        content_text: row.try_get("content_text")?,
        content_html: row.try_get("content_html")?,
        assets,
        transcript_status: row.try_get("transcript_status")?,
        ingest_status: row.try_get("ingest_status")?,
        is_archived: row.try_get("is_archived")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_segment(row: &PgRow) -> SnResult<Segment> {
    let labels_json: Json = row.try_get("labels")?;
    let labels: Vec<String> = serde_json::from_value(labels_json)?;
    Ok(Segment {
        id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        text: row.try_get("text")?,
        content_html: row.try_get("content_html")?,
        start_offset: row.try_get("start_offset")?,
        end_offset: row.try_get("end_offset")?,
        offset_kind: row.try_get("offset_kind")?,
        segment_status: row.try_get("segment_status")?,
        version: row.try_get("version")?,
        labels,
        provenance: row.try_get("provenance")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const SEGMENT_PREVIEW_LEN: usize = 280;

fn preview(text: &str) -> String {
    if text.chars().count() <= SEGMENT_PREVIEW_LEN {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(SEGMENT_PREVIEW_LEN).collect();
        format!("{truncated}\u{2026}")
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> SnResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ── Sources ──────────────────────────────────────────────────────────
    async fn list_sources(&self) -> SnResult<Vec<Source>> {
        let rows = sqlx::query_as::<_, Source>("SELECT * FROM sources ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_source(&self, id: Uuid) -> SnResult<Source> {
        sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("source {id}")))
    }

    // ── Documents ────────────────────────────────────────────────────────
    async fn list_active_documents_with_segment_counts(&self) -> SnResult<Vec<(Document, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT d.*, COUNT(s.id) AS segment_count
            FROM documents d
            LEFT JOIN segments s ON s.document_id = d.id
            WHERE d.is_archived = false
            GROUP BY d.id
            ORDER BY d.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((row_to_document(row)?, row.try_get::<i64, _>("segment_count")?)))
            .collect()
    }

    async fn get_document(&self, id: Uuid) -> SnResult<Document> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("document {id}")))?;
        row_to_document(&row)
    }

    async fn archive_document(&self, id: Uuid) -> SnResult<Document> {
        let row = sqlx::query(
            "UPDATE documents SET is_archived = true, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SnError::NotFound(format!("document {id}")))?;
        row_to_document(&row)
    }

    async fn upsert_document(&self, doc: NewDocument) -> SnResult<Document> {
        let assets_json = serde_json::to_value(&doc.assets)?;
        let row = sqlx::query(
            r#"
            INSERT INTO documents
                (source_id, external_id, title, author, published_at,
                 original_url, original_media_type, content_text, content_html, assets)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            ON CONFLICT (source_id, external_id) DO UPDATE SET
                title = EXCLUDED.title,
                author = EXCLUDED.author,
                published_at = EXCLUDED.published_at,
                original_url = EXCLUDED.original_url,
                original_media_type = EXCLUDED.original_media_type,
                content_text = COALESCE(EXCLUDED.content_text, documents.content_text),
                content_html = COALESCE(EXCLUDED.content_html, documents.content_html),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(doc.source_id)
        .bind(&doc.external_id)
        .bind(&doc.title)
        .bind(&doc.author)
        .bind(doc.published_at)
        .bind(&doc.original_url)
        .bind(&doc.original_media_type)
        .bind(&doc.content_text)
        .bind(&doc.content_html)
        .bind(&assets_json)
        .fetch_one(&self.pool)
        .await?;
        row_to_document(&row)
    }

    async fn append_transcript_asset(
        &self,
        document_id: Uuid,
        asset: DocumentAsset,
        full_text: Option<String>,
        status: TranscriptStatus,
    ) -> SnResult<Document> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query("SELECT * FROM documents WHERE id = $1 FOR UPDATE")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("document {document_id}")))?;
        let mut existing = row_to_document(&current)?;
        existing.assets.push(asset);
        let assets_json = serde_json::to_value(&existing.assets)?;

        let row = sqlx::query(
            r#"
            UPDATE documents
            SET assets = $1,
                transcript_status = $2,
                content_text = COALESCE($3, content_text),
                updated_at = now()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&assets_json)
        .bind(status)
        .bind(&full_text)
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await?;
        let updated = row_to_document(&row)?;
        tx.commit().await?;
        Ok(updated)
    }

    // ── Segments ─────────────────────────────────────────────────────────
    async fn list_segments(&self) -> SnResult<Vec<(Segment, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT s.*, COUNT(l.id) AS link_count
            FROM segments s
            LEFT JOIN hypothesis_segment_link l ON l.segment_id = s.id
            GROUP BY s.id
            ORDER BY s.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((row_to_segment(row)?, row.try_get::<i64, _>("link_count")?)))
            .collect()
    }

    async fn list_segments_for_document(&self, document_id: Uuid) -> SnResult<Vec<Segment>> {
        let rows = sqlx::query(
            "SELECT * FROM segments WHERE document_id = $1 ORDER BY start_offset NULLS LAST, created_at",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_segment).collect()
    }

    async fn get_segment_workbench(&self, segment_id: Uuid) -> SnResult<SegmentWorkbench> {
        let seg_row = sqlx::query("SELECT * FROM segments WHERE id = $1")
            .bind(segment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("segment {segment_id}")))?;
        let segment = row_to_segment(&seg_row)?;
        let doc_row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(segment.document_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("document {}", segment.document_id)))?;
        let document = row_to_document(&doc_row)?;
        Ok(SegmentWorkbench { segment, document })
    }

    async fn create_segment(&self, new: NewSegment) -> SnResult<Segment> {
        let labels_json = serde_json::to_value(&new.labels)?;
        let row = sqlx::query(
            r#"
            INSERT INTO segments
                (document_id, text, content_html, start_offset, end_offset, offset_kind, labels, provenance)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING *
            "#,
        )
        .bind(new.document_id)
        .bind(&new.text)
        .bind(&new.content_html)
        .bind(new.start_offset)
        .bind(new.end_offset)
        .bind(new.offset_kind)
        .bind(&labels_json)
        .bind(&new.provenance)
        .fetch_one(&self.pool)
        .await?;
        row_to_segment(&row)
    }

    async fn delete_segment(&self, id: Uuid) -> SnResult<()> {
        let result = sqlx::query("DELETE FROM segments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SnError::NotFound(format!("segment {id}")));
        }
        Ok(())
    }

    // ── Hypotheses ───────────────────────────────────────────────────────
    async fn list_hypotheses(&self) -> SnResult<Vec<(Hypothesis, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT h.*, COUNT(l.id) AS evidence_count
            FROM hypotheses h
            LEFT JOIN hypothesis_segment_link l ON l.hypothesis_id = h.id
            GROUP BY h.id
            ORDER BY h.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((Hypothesis::from_row(row)?, row.try_get::<i64, _>("evidence_count")?)))
            .collect()
    }

    async fn get_hypothesis(&self, id: Uuid) -> SnResult<Hypothesis> {
        sqlx::query_as::<_, Hypothesis>("SELECT * FROM hypotheses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| SnError::NotFound(format!("hypothesis {id}")))
    }

    async fn create_hypothesis(&self, new: NewHypothesis) -> SnResult<Hypothesis> {
        sqlx::query_as::<_, Hypothesis>(
            r#"
            INSERT INTO hypotheses (hypothesis_text, description, reference_url, reference_type)
            VALUES ($1,$2,$3,$4)
            RETURNING *
            "#,
        )
        .bind(&new.hypothesis_text)
        .bind(&new.description)
        .bind(&new.reference_url)
        .bind(new.reference_type)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update_hypothesis(&self, id: Uuid, patch: HypothesisPatch) -> SnResult<Hypothesis> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Hypothesis>(
            "SELECT * FROM hypotheses WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| SnError::NotFound(format!("hypothesis {id}")))?;

        let next_text = patch.hypothesis_text.clone().unwrap_or_else(|| current.hypothesis_text.clone());
        let next_description = patch.description.clone().unwrap_or_else(|| current.description.clone());
        let next_reference_url = patch.reference_url.clone().unwrap_or_else(|| current.reference_url.clone());
        let next_reference_type = patch.reference_type.unwrap_or(current.reference_type);

        let changed = next_text != current.hypothesis_text
            || next_description != current.description
            || next_reference_url != current.reference_url
            || next_reference_type != current.reference_type;

        if changed {
            sqlx::query(
                r#"
                INSERT INTO hypothesis_versions
                    (hypothesis_id, hypothesis_text, description, reference_url, reference_type, recorded_by)
                VALUES ($1,$2,$3,$4,$5,$6)
                "#,
            )
            .bind(current.id)
            .bind(&current.hypothesis_text)
            .bind(&current.description)
            .bind(&current.reference_url)
            .bind(current.reference_type)
            .bind(&patch.recorded_by)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, Hypothesis>(
            r#"
            UPDATE hypotheses
            SET hypothesis_text = $1, description = $2, reference_url = $3, reference_type = $4, updated_at = now()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&next_text)
        .bind(&next_description)
        .bind(&next_reference_url)
        .bind(next_reference_type)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_hypothesis(&self, id: Uuid) -> SnResult<()> {
        let result = sqlx::query("DELETE FROM hypotheses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SnError::NotFound(format!("hypothesis {id}")));
        }
        Ok(())
    }

    async fn list_hypothesis_versions(&self, hypothesis_id: Uuid) -> SnResult<Vec<HypothesisVersion>> {
        let rows = sqlx::query_as::<_, HypothesisVersion>(
            "SELECT * FROM hypothesis_versions WHERE hypothesis_id = $1 ORDER BY recorded_at",
        )
        .bind(hypothesis_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Evidence: links + runs ───────────────────────────────────────────
    async fn list_hypotheses_for_segment(&self, segment_id: Uuid) -> SnResult<Vec<HypothesisSegmentLink>> {
        let rows = sqlx::query_as::<_, HypothesisSegmentLink>(
            "SELECT * FROM hypothesis_segment_link WHERE segment_id = $1 ORDER BY updated_at DESC",
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_evidence_for_hypothesis(&self, hypothesis_id: Uuid) -> SnResult<Vec<EvidenceRow>> {
        let hypothesis = self.get_hypothesis(hypothesis_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT
                l.id, l.hypothesis_id, l.segment_id, l.verdict, l.analysis_text,
                l.authored_by, l.updated_at,
                s.text AS segment_text,
                d.id AS document_id,
                d.title AS document_title
            FROM hypothesis_segment_link l
            JOIN segments s ON s.id = l.segment_id
            JOIN documents d ON d.id = s.document_id
            WHERE l.hypothesis_id = $1
            ORDER BY l.updated_at DESC
            "#,
        )
        .bind(hypothesis_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let link = HypothesisSegmentLink {
                    id: row.try_get("id")?,
                    hypothesis_id: row.try_get("hypothesis_id")?,
                    segment_id: row.try_get("segment_id")?,
                    verdict: row.try_get("verdict")?,
                    analysis_text: row.try_get("analysis_text")?,
                    authored_by: row.try_get("authored_by")?,
                    updated_at: row.try_get("updated_at")?,
                };
                let segment_text: String = row.try_get("segment_text")?;
                let freshness_status = if link.updated_at < hypothesis.updated_at {
                    sn_common::enums::FreshnessStatus::Stale
                } else {
                    sn_common::enums::FreshnessStatus::Current
                };
                Ok(EvidenceRow {
                    document_id: row.try_get("document_id")?,
                    document_title: row.try_get("document_title")?,
                    segment_preview: preview(&segment_text),
                    link,
                    freshness_status,
                })
            })
            .collect()
    }

    async fn commit_evidence(
        &self,
        segment_id: Uuid,
        items: Vec<CommitEvidenceItem>,
    ) -> SnResult<Vec<CommitEvidenceOutcome>> {
        let mut tx = self.pool.begin().await?;
        // spec §4.1: commit_evidence runs under REPEATABLE READ so concurrent
        // commits for the same (hypothesis_id, segment_id) serialize on the
        // FOR UPDATE link/hypothesis locks below rather than silently
        // interleaving under READ COMMITTED's per-statement snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            // Step 1: resolve or create the hypothesis.
            let (hypothesis, hypothesis_created) = match item.hypothesis_id {
                None => {
                    let created = sqlx::query_as::<_, Hypothesis>(
                        r#"
                        INSERT INTO hypotheses (hypothesis_text, description)
                        VALUES ($1,$2)
                        RETURNING *
                        "#,
                    )
                    .bind(&item.hypothesis_text)
                    .bind(&item.description)
                    .fetch_one(&mut *tx)
                    .await?;
                    (created, true)
                }
                Some(hid) => {
                    let current = sqlx::query_as::<_, Hypothesis>(
                        "SELECT * FROM hypotheses WHERE id = $1 FOR UPDATE",
                    )
                    .bind(hid)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| SnError::NotFound(format!("hypothesis {hid}")))?;

                    let changed = item.hypothesis_text != current.hypothesis_text
                        || item.description != current.description;

                    if changed {
                        sqlx::query(
                            r#"
                            INSERT INTO hypothesis_versions
                                (hypothesis_id, hypothesis_text, description, reference_url, reference_type)
                            VALUES ($1,$2,$3,$4,$5)
                            "#,
                        )
                        .bind(current.id)
                        .bind(&current.hypothesis_text)
                        .bind(&current.description)
                        .bind(&current.reference_url)
                        .bind(current.reference_type)
                        .execute(&mut *tx)
                        .await?;

                        let updated = sqlx::query_as::<_, Hypothesis>(
                            r#"
                            UPDATE hypotheses
                            SET hypothesis_text = $1, description = $2, updated_at = now()
                            WHERE id = $3
                            RETURNING *
                            "#,
                        )
                        .bind(&item.hypothesis_text)
                        .bind(&item.description)
                        .bind(hid)
                        .fetch_one(&mut *tx)
                        .await?;
                        (updated, false)
                    } else {
                        (current, false)
                    }
                }
            };

            let verdict = item.verdict.unwrap_or(Verdict::None);

            // Step 2: upsert the link, locking the pair row if it already exists.
            let existing_link = sqlx::query_as::<_, HypothesisSegmentLink>(
                "SELECT * FROM hypothesis_segment_link WHERE hypothesis_id = $1 AND segment_id = $2 FOR UPDATE",
            )
            .bind(hypothesis.id)
            .bind(segment_id)
            .fetch_optional(&mut *tx)
            .await?;

            let link = match existing_link {
                None => {
                    sqlx::query_as::<_, HypothesisSegmentLink>(
                        r#"
                        INSERT INTO hypothesis_segment_link
                            (hypothesis_id, segment_id, verdict, analysis_text, authored_by)
                        VALUES ($1,$2,$3,$4,$5)
                        RETURNING *
                        "#,
                    )
                    .bind(hypothesis.id)
                    .bind(segment_id)
                    .bind(verdict)
                    .bind(&item.analysis_text)
                    .bind(item.authored_by)
                    .fetch_one(&mut *tx)
                    .await?
                }
                Some(existing) => {
                    sqlx::query_as::<_, HypothesisSegmentLink>(
                        r#"
                        UPDATE hypothesis_segment_link
                        SET verdict = $1, analysis_text = $2, authored_by = $3, updated_at = now()
                        WHERE id = $4
                        RETURNING *
                        "#,
                    )
                    .bind(verdict)
                    .bind(&item.analysis_text)
                    .bind(item.authored_by)
                    .bind(existing.id)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };

            // Step 3: append a run with post-step-1 hypothesis snapshots.
            let run = sqlx::query_as::<_, HypothesisSegmentLinkRun>(
                r#"
                INSERT INTO hypothesis_segment_link_run
                    (link_id, hypothesis_id, segment_id, verdict, analysis_text, authored_by,
                     hypothesis_text_snapshot, description_snapshot, reference_url_snapshot,
                     reference_type_snapshot, hypothesis_updated_at_snapshot)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
                RETURNING *
                "#,
            )
            .bind(link.id)
            .bind(hypothesis.id)
            .bind(segment_id)
            .bind(verdict)
            .bind(&item.analysis_text)
            .bind(item.authored_by)
            .bind(&hypothesis.hypothesis_text)
            .bind(&hypothesis.description)
            .bind(&hypothesis.reference_url)
            .bind(hypothesis.reference_type)
            .bind(hypothesis.updated_at)
            .fetch_one(&mut *tx)
            .await?;

            outcomes.push(CommitEvidenceOutcome {
                hypothesis_id: hypothesis.id,
                link,
                run,
                hypothesis_created,
            });
        }

        tx.commit().await?;
        Ok(outcomes)
    }

    // ── Questions ────────────────────────────────────────────────────────
    async fn list_questions(&self) -> SnResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>("SELECT * FROM questions ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_question(&self, question_text: String) -> SnResult<Question> {
        sqlx::query_as::<_, Question>(
            "INSERT INTO questions (question_text) VALUES ($1) RETURNING *",
        )
        .bind(question_text)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn delete_question(&self, id: Uuid) -> SnResult<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(SnError::NotFound(format!("question {id}")));
        }
        Ok(())
    }

    async fn list_hypotheses_for_question(&self, question_id: Uuid) -> SnResult<Vec<Hypothesis>> {
        let rows = sqlx::query_as::<_, Hypothesis>(
            r#"
            SELECT h.*
            FROM hypotheses h
            JOIN question_hypothesis_link qhl ON qhl.hypothesis_id = h.id
            WHERE qhl.question_id = $1
            ORDER BY qhl.created_at
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn link_question_hypothesis(&self, question_id: Uuid, hypothesis_id: Uuid) -> SnResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO question_hypothesis_link (question_id, hypothesis_id)
            VALUES ($1,$2)
            ON CONFLICT (question_id, hypothesis_id) DO NOTHING
            "#,
        )
        .bind(question_id)
        .bind(hypothesis_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SnError::Conflict(format!(
                "question {question_id} already linked to hypothesis {hypothesis_id}"
            )));
        }
        Ok(())
    }

    // ── Reference cache ──────────────────────────────────────────────────
    async fn get_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Option<ReferenceCacheEntry>> {
        let row = sqlx::query_as::<_, ReferenceCacheEntry>(
            "SELECT * FROM hypothesis_reference_cache WHERE hypothesis_id = $1",
        )
        .bind(hypothesis_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_reference_cache(
        &self,
        hypothesis_id: Uuid,
        full_text: String,
        character_count: i32,
    ) -> SnResult<ReferenceCacheEntry> {
        sqlx::query_as::<_, ReferenceCacheEntry>(
            r#"
            INSERT INTO hypothesis_reference_cache (hypothesis_id, full_text, character_count)
            VALUES ($1,$2,$3)
            ON CONFLICT (hypothesis_id) DO UPDATE SET
                full_text = EXCLUDED.full_text,
                character_count = EXCLUDED.character_count,
                fetched_at = now()
            RETURNING *
            "#,
        )
        .bind(hypothesis_id)
        .bind(full_text)
        .bind(character_count)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn lock_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Box<dyn ReferenceCacheLock>> {
        // Session-level lock on a dedicated connection, so it outlives this
        // call and actually serializes the caller's whole fetch-then-store
        // sequence (spec §4.6) rather than releasing the instant this
        // statement finishes, as a transaction-scoped lock would on a pool
        // call with no surrounding transaction.
        let mut conn = self.pool.acquire().await?;
        let key: i64 = sqlx::query_scalar("SELECT hashtext($1::text)::bigint")
            .bind(hypothesis_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(key)
            .execute(&mut *conn)
            .await?;
        Ok(Box::new(PgReferenceCacheGuard { conn: Some(conn), key }))
    }
}

/// Holds the advisory lock for the lifetime of the guard; [`Drop`] releases
/// it best-effort (fire-and-forget) if the caller never called `release`.
pub struct PgReferenceCacheGuard {
    conn: Option<sqlx::pool::PoolConnection<sqlx::Postgres>>,
    key: i64,
}

#[async_trait]
impl ReferenceCacheLock for PgReferenceCacheGuard {
    async fn release(mut self: Box<Self>) -> SnResult<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(self.key)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

impl Drop for PgReferenceCacheGuard {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let key = self.key;
            tokio::spawn(async move {
                if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
                    .bind(key)
                    .execute(&mut *conn)
                    .await
                {
                    tracing::warn!(key, error = %e, "failed to release reference cache lock on drop");
                }
            });
        }
    }
}


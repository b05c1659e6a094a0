//! The Store contract (C1, spec §4.1): typed access to the relational
//! model. Every multi-row write runs inside a single transaction; the one
//! implementation is [`crate::pg_store::PgStore`], backed by `sqlx::PgPool`.
//! The trait exists so `sn-evidence` and `sn-api` can be unit-tested against
//! an in-memory fake (see `sn-test-utils::fake_store`) without a live
//! Postgres instance.

use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use sn_common::enums::{AuthoredBy, OffsetKind, ReferenceType, Verdict};
use sn_common::SnResult;
use uuid::Uuid;

/// One item of a `commit_evidence` batch (spec §4.7.3). A null `hypothesis_id`
/// creates a new hypothesis from `hypothesis_text` + `description`; reference
/// fields aren't part of this path (they're set via `update_hypothesis`).
#[derive(Debug, Clone)]
pub struct CommitEvidenceItem {
    pub hypothesis_id: Option<Uuid>,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub verdict: Option<Verdict>,
    pub analysis_text: Option<String>,
    pub authored_by: AuthoredBy,
}

/// What one committed item produced, for the API response.
#[derive(Debug, Clone)]
pub struct CommitEvidenceOutcome {
    pub hypothesis_id: Uuid,
    pub link: HypothesisSegmentLink,
    pub run: HypothesisSegmentLinkRun,
    pub hypothesis_created: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// `GET /healthz` (spec §6): `Ok(())` once the backing store can
    /// actually serve a query, not just that the process is up.
    async fn ping(&self) -> SnResult<()>;

    // ── Sources ──────────────────────────────────────────────────────────
    async fn list_sources(&self) -> SnResult<Vec<Source>>;
    async fn get_source(&self, id: Uuid) -> SnResult<Source>;

    // ── Documents ────────────────────────────────────────────────────────
    async fn list_active_documents_with_segment_counts(&self) -> SnResult<Vec<(Document, i64)>>;
    async fn get_document(&self, id: Uuid) -> SnResult<Document>;
    async fn archive_document(&self, id: Uuid) -> SnResult<Document>;
    /// Upsert by `(source_id, external_id)` (spec §4.3 `Ingestor` contract).
    async fn upsert_document(&self, doc: NewDocument) -> SnResult<Document>;
    async fn append_transcript_asset(
        &self,
        document_id: Uuid,
        asset: DocumentAsset,
        full_text: Option<String>,
        status: sn_common::enums::TranscriptStatus,
    ) -> SnResult<Document>;

    // ── Segments ─────────────────────────────────────────────────────────
    async fn list_segments(&self) -> SnResult<Vec<(Segment, i64)>>;
    async fn list_segments_for_document(&self, document_id: Uuid) -> SnResult<Vec<Segment>>;
    async fn get_segment_workbench(&self, segment_id: Uuid) -> SnResult<SegmentWorkbench>;
    async fn create_segment(&self, new: NewSegment) -> SnResult<Segment>;
    async fn delete_segment(&self, id: Uuid) -> SnResult<()>;

    // ── Hypotheses ───────────────────────────────────────────────────────
    async fn list_hypotheses(&self) -> SnResult<Vec<(Hypothesis, i64)>>;
    async fn get_hypothesis(&self, id: Uuid) -> SnResult<Hypothesis>;
    async fn create_hypothesis(&self, new: NewHypothesis) -> SnResult<Hypothesis>;
    /// Updates content fields; if any changed, snapshots the pre-image into
    /// `HypothesisVersion` in the same statement-group (spec §4.1).
    async fn update_hypothesis(&self, id: Uuid, patch: HypothesisPatch) -> SnResult<Hypothesis>;
    async fn delete_hypothesis(&self, id: Uuid) -> SnResult<()>;
    async fn list_hypothesis_versions(&self, hypothesis_id: Uuid) -> SnResult<Vec<HypothesisVersion>>;

    // ── Evidence: links + runs ───────────────────────────────────────────
    async fn list_hypotheses_for_segment(&self, segment_id: Uuid) -> SnResult<Vec<HypothesisSegmentLink>>;
    async fn list_evidence_for_hypothesis(&self, hypothesis_id: Uuid) -> SnResult<Vec<EvidenceRow>>;
    /// The transactional core of spec §4.7.3: for each item, resolve/create
    /// the hypothesis, upsert the link, append a run with post-step-1
    /// snapshots — all in one transaction across the whole batch.
    async fn commit_evidence(
        &self,
        segment_id: Uuid,
        items: Vec<CommitEvidenceItem>,
    ) -> SnResult<Vec<CommitEvidenceOutcome>>;

    // ── Questions ────────────────────────────────────────────────────────
    async fn list_questions(&self) -> SnResult<Vec<Question>>;
    async fn create_question(&self, question_text: String) -> SnResult<Question>;
    async fn delete_question(&self, id: Uuid) -> SnResult<()>;
    async fn list_hypotheses_for_question(&self, question_id: Uuid) -> SnResult<Vec<Hypothesis>>;
    /// Conflict (409) if the pair already exists (spec §7).
    async fn link_question_hypothesis(&self, question_id: Uuid, hypothesis_id: Uuid) -> SnResult<()>;

    // ── Reference cache ──────────────────────────────────────────────────
    async fn get_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Option<ReferenceCacheEntry>>;
    async fn put_reference_cache(
        &self,
        hypothesis_id: Uuid,
        full_text: String,
        character_count: i32,
    ) -> SnResult<ReferenceCacheEntry>;
    /// Serializes concurrent fetches for the same hypothesis (spec §4.6),
    /// held for the duration of the caller's check-then-fetch-then-store
    /// sequence. Call [`ReferenceCacheLock::release`] once that sequence is
    /// done; a held-but-unreleased guard is also released (best-effort) on
    /// drop.
    async fn lock_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Box<dyn ReferenceCacheLock>>;
}

/// A held lock on a hypothesis's reference-cache slot. Boxed as a trait
/// object (rather than a concrete `Store`-specific guard type) so `Store`
/// stays object-safe and fakeable — [`crate::pg_store::PgReferenceCacheGuard`]
/// holds a real advisory lock; an in-memory fake can hold whatever it needs
/// to serialize test callers.
#[async_trait]
pub trait ReferenceCacheLock: Send {
    async fn release(self: Box<Self>) -> SnResult<()>;
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub source_id: Uuid,
    pub external_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub original_url: Option<String>,
    pub original_media_type: Option<String>,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub assets: Vec<DocumentAsset>,
}

#[derive(Debug, Clone)]
pub struct NewSegment {
    pub document_id: Uuid,
    pub text: String,
    pub content_html: Option<String>,
    pub start_offset: Option<i32>,
    pub end_offset: Option<i32>,
    pub offset_kind: Option<OffsetKind>,
    pub labels: Vec<String>,
    pub provenance: Option<Json>,
}

#[derive(Debug, Clone)]
pub struct NewHypothesis {
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub reference_type: ReferenceType,
}

#[derive(Debug, Clone, Default)]
pub struct HypothesisPatch {
    pub hypothesis_text: Option<String>,
    pub description: Option<Option<String>>,
    pub reference_url: Option<Option<String>>,
    pub reference_type: Option<ReferenceType>,
    pub recorded_by: Option<String>,
}

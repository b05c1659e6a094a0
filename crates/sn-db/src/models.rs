//! Row types returned by the [`crate::Store`] trait. Enum fields decode as
//! Postgres `text` via the `Type`/`Decode`/`Encode` impls generated by
//! `sn_common::enums::text_enum!` (spec §3.1), so a migration never has to
//! touch a native Postgres `ENUM` type. Rows with a `jsonb` column (assets,
//! labels, metadata) are assembled by hand in `pg_store.rs` rather than via
//! `#[derive(FromRow)]`, since those fields aren't themselves `Decode`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sn_common::enums::{
    AuthoredBy, FreshnessStatus, IngestStatus, JobStatus, OffsetKind, ReferenceType, SegmentStatus,
    SourceType, TranscriptStatus, TranscriptionProvider, Verdict,
};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub source_type: SourceType,
    pub feed_url: Option<String>,
    pub is_active: bool,
    pub poll_cadence_secs: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAsset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub url: String,
    pub duration: Option<f64>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub text: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
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
    pub transcript_status: TranscriptStatus,
    pub ingest_status: IngestStatus,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub text: String,
    pub content_html: Option<String>,
    pub start_offset: Option<i32>,
    pub end_offset: Option<i32>,
    pub offset_kind: Option<OffsetKind>,
    pub segment_status: SegmentStatus,
    pub version: i32,
    pub labels: Vec<String>,
    pub provenance: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Hypothesis {
    pub id: Uuid,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub reference_type: ReferenceType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HypothesisVersion {
    pub id: Uuid,
    pub hypothesis_id: Uuid,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub reference_type: ReferenceType,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HypothesisSegmentLink {
    pub id: Uuid,
    pub hypothesis_id: Uuid,
    pub segment_id: Uuid,
    pub verdict: Verdict,
    pub analysis_text: Option<String>,
    pub authored_by: Option<AuthoredBy>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HypothesisSegmentLinkRun {
    pub id: Uuid,
    pub link_id: Uuid,
    pub hypothesis_id: Uuid,
    pub segment_id: Uuid,
    pub verdict: Verdict,
    pub analysis_text: Option<String>,
    pub authored_by: AuthoredBy,
    pub created_at: DateTime<Utc>,
    pub hypothesis_text_snapshot: String,
    pub description_snapshot: Option<String>,
    pub reference_url_snapshot: Option<String>,
    pub reference_type_snapshot: ReferenceType,
    pub hypothesis_updated_at_snapshot: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferenceCacheEntry {
    pub hypothesis_id: Uuid,
    pub full_text: String,
    pub character_count: i32,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngestionRequest {
    pub id: Uuid,
    pub source_id: Uuid,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    pub id: Uuid,
    pub document_id: Uuid,
    pub provider: TranscriptionProvider,
    pub model: Option<String>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub status: JobStatus,
    pub result_text: Option<String>,
    pub metadata: Json,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enriched row returned by `list_evidence_for_hypothesis` (spec §4.7.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub link: HypothesisSegmentLink,
    pub segment_preview: String,
    pub document_id: Uuid,
    pub document_title: Option<String>,
    pub freshness_status: FreshnessStatus,
}

/// A segment plus the document it belongs to, for `get_segment_workbench`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentWorkbench {
    pub segment: Segment,
    pub document: Document,
}

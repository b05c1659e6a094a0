//! Explicit request/response DTOs for every route in §6. The dynamic JSON
//! surface of the original system is re-expressed here as typed records
//! with nullability made precise: a field marked optional in the spec is a
//! genuine `Option`, and `verdict`/`reference_type`/etc. are tagged
//! enumerations rather than free text (spec §9).

use chrono::{DateTime, Utc};
use serde::{de::Deserializer, Deserialize, Serialize};
use sn_common::enums::{
    AnalysisMode, AuthoredBy, FreshnessStatus, IngestStatus, JobStatus, OffsetKind, ReferenceType,
    SegmentStatus, SourceType, TranscriptStatus, TranscriptionProvider, Verdict,
};
use sn_db::models::{
    Document, EvidenceRow, Hypothesis, HypothesisSegmentLink, Question, Segment, SegmentWorkbench,
    Source, TranscriptionRequest as TranscriptionRequestRow,
};
use uuid::Uuid;

/// Deserializes a present-but-possibly-null field into `Some(Option<T>)`,
/// leaving an absent field as `None` — the standard double-`Option` trick
/// so PATCH bodies can distinguish "don't touch this field" from "set it to
/// null" (spec §6 `PATCH /hypotheses/{id}`).
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ── Sources ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SourceDto {
    pub id: Uuid,
    pub name: String,
    pub source_type: SourceType,
    pub feed_url: Option<String>,
    pub is_active: bool,
    pub poll_cadence_secs: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Source> for SourceDto {
    fn from(s: Source) -> Self {
        Self {
            id: s.id,
            name: s.name,
            source_type: s.source_type,
            feed_url: s.feed_url,
            is_active: s.is_active,
            poll_cadence_secs: s.poll_cadence_secs,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

// ── Ingestion requests ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IngestRequestsBody {
    pub source_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct IngestRequestsResponse {
    pub queued_jobs: usize,
}

// ── Documents ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DocumentAssetDto {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub url: String,
    pub duration: Option<f64>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub text: Option<String>,
    pub provider: Option<String>,
}

impl From<sn_db::models::DocumentAsset> for DocumentAssetDto {
    fn from(a: sn_db::models::DocumentAsset) -> Self {
        Self {
            asset_type: a.asset_type,
            url: a.url,
            duration: a.duration,
            start_seconds: a.start_seconds,
            end_seconds: a.end_seconds,
            text: a.text,
            provider: a.provider,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentSummaryDto {
    pub id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub original_url: Option<String>,
    pub original_media_type: Option<String>,
    pub transcript_status: TranscriptStatus,
    pub ingest_status: IngestStatus,
    pub is_archived: bool,
    pub segment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentSummaryDto {
    pub fn from_row(doc: Document, segment_count: i64) -> Self {
        Self {
            id: doc.id,
            source_id: doc.source_id,
            external_id: doc.external_id,
            title: doc.title,
            author: doc.author,
            published_at: doc.published_at,
            original_url: doc.original_url,
            original_media_type: doc.original_media_type,
            transcript_status: doc.transcript_status,
            ingest_status: doc.ingest_status,
            is_archived: doc.is_archived,
            segment_count,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentContentDto {
    pub content_text: Option<String>,
    pub content_html: Option<String>,
}

impl From<Document> for DocumentContentDto {
    fn from(d: Document) -> Self {
        Self { content_text: d.content_text, content_html: d.content_html }
    }
}

// ── Segments ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SegmentDto {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Segment> for SegmentDto {
    fn from(s: Segment) -> Self {
        Self {
            id: s.id,
            document_id: s.document_id,
            text: s.text,
            content_html: s.content_html,
            start_offset: s.start_offset,
            end_offset: s.end_offset,
            offset_kind: s.offset_kind,
            segment_status: s.segment_status,
            version: s.version,
            labels: s.labels,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SegmentSummaryDto {
    #[serde(flatten)]
    pub segment: SegmentDto,
    pub preview: String,
    pub linked_hypothesis_count: i64,
}

/// The document fields a segment's workbench view needs — enough to show
/// surrounding context without the segment-count aggregate that only makes
/// sense for the document list (spec §6 `GET /segments/{id}`).
#[derive(Debug, Serialize)]
pub struct WorkbenchDocumentDto {
    pub id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content_text: Option<String>,
    pub content_html: Option<String>,
    pub transcript_status: TranscriptStatus,
}

impl From<Document> for WorkbenchDocumentDto {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            title: d.title,
            author: d.author,
            content_text: d.content_text,
            content_html: d.content_html,
            transcript_status: d.transcript_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SegmentWorkbenchDto {
    pub segment: SegmentDto,
    pub document: WorkbenchDocumentDto,
}

impl From<SegmentWorkbench> for SegmentWorkbenchDto {
    fn from(w: SegmentWorkbench) -> Self {
        Self { segment: w.segment.into(), document: w.document.into() }
    }
}

const SEGMENT_PREVIEW_LEN: usize = 280;

pub fn preview(text: &str) -> String {
    if text.chars().count() <= SEGMENT_PREVIEW_LEN {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(SEGMENT_PREVIEW_LEN).collect();
        format!("{truncated}\u{2026}")
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSegmentBody {
    pub document_id: Uuid,
    pub text: String,
    pub content_html: Option<String>,
    pub start_offset: Option<i32>,
    pub end_offset: Option<i32>,
    #[serde(default)]
    pub offset_kind: Option<OffsetKind>,
    #[serde(default)]
    pub labels: Vec<String>,
}

// ── Evidence links ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LinkDto {
    pub id: Uuid,
    pub hypothesis_id: Uuid,
    pub segment_id: Uuid,
    pub verdict: Verdict,
    pub analysis_text: Option<String>,
    pub authored_by: Option<AuthoredBy>,
    pub updated_at: DateTime<Utc>,
}

impl From<HypothesisSegmentLink> for LinkDto {
    fn from(l: HypothesisSegmentLink) -> Self {
        Self {
            id: l.id,
            hypothesis_id: l.hypothesis_id,
            segment_id: l.segment_id,
            verdict: l.verdict,
            analysis_text: l.analysis_text,
            authored_by: l.authored_by,
            updated_at: l.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvidenceDto {
    #[serde(flatten)]
    pub link: LinkDto,
    pub segment_preview: String,
    pub document_id: Uuid,
    pub document_title: Option<String>,
    pub freshness_status: FreshnessStatus,
}

impl From<EvidenceRow> for EvidenceDto {
    fn from(e: EvidenceRow) -> Self {
        Self {
            segment_preview: e.segment_preview,
            document_id: e.document_id,
            document_title: e.document_title,
            freshness_status: e.freshness_status,
            link: e.link.into(),
        }
    }
}

// ── Suggestions ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SuggestionDto {
    pub hypothesis_id: Option<Uuid>,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub source: sn_common::enums::SuggestionSource,
}

impl From<sn_adapters::HypothesisSuggestion> for SuggestionDto {
    fn from(s: sn_adapters::HypothesisSuggestion) -> Self {
        Self { hypothesis_id: s.hypothesis_id, hypothesis_text: s.hypothesis_text, description: s.description, source: s.source }
    }
}

// ── Commit evidence ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommitEvidenceItemBody {
    pub hypothesis_id: Option<Uuid>,
    pub hypothesis_text: String,
    pub description: Option<String>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    pub analysis_text: Option<String>,
    #[serde(default = "default_authored_by")]
    pub authored_by: AuthoredBy,
}

fn default_authored_by() -> AuthoredBy {
    AuthoredBy::Human
}

#[derive(Debug, Deserialize)]
pub struct CommitEvidenceBody {
    pub items: Vec<CommitEvidenceItemBody>,
}

#[derive(Debug, Serialize)]
pub struct CommitEvidenceOutcomeDto {
    pub hypothesis_id: Uuid,
    pub hypothesis_created: bool,
    pub link: LinkDto,
    pub run_id: Uuid,
}

impl From<sn_db::CommitEvidenceOutcome> for CommitEvidenceOutcomeDto {
    fn from(o: sn_db::CommitEvidenceOutcome) -> Self {
        Self { hypothesis_id: o.hypothesis_id, hypothesis_created: o.hypothesis_created, run_id: o.run.id, link: o.link.into() }
    }
}

// ── Hypotheses ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HypothesisDto {
    pub id: Uuid,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub reference_type: ReferenceType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Hypothesis> for HypothesisDto {
    fn from(h: Hypothesis) -> Self {
        Self {
            id: h.id,
            hypothesis_text: h.hypothesis_text,
            description: h.description,
            reference_url: h.reference_url,
            reference_type: h.reference_type,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HypothesisSummaryDto {
    #[serde(flatten)]
    pub hypothesis: HypothesisDto,
    pub evidence_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateHypothesisBody {
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    #[serde(default)]
    pub reference_type: Option<ReferenceType>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateHypothesisBody {
    pub hypothesis_text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub reference_url: Option<Option<String>>,
    #[serde(default)]
    pub reference_type: Option<ReferenceType>,
    pub recorded_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceDto {
    pub hypothesis_id: Uuid,
    pub reference_text: Option<String>,
    pub character_count: Option<i32>,
}

// ── Questions ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct QuestionDto {
    pub id: Uuid,
    pub question_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Question> for QuestionDto {
    fn from(q: Question) -> Self {
        Self { id: q.id, question_text: q.question_text, created_at: q.created_at, updated_at: q.updated_at }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionBody {
    pub question_text: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkQuestionHypothesisBody {
    pub hypothesis_id: Uuid,
}

// ── Analysis ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckHypothesisBody {
    pub segment_text: String,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    #[serde(default)]
    pub include_full_reference: bool,
    pub hypothesis_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CheckHypothesisResponse {
    pub verdict: Verdict,
    pub analysis_text: String,
    pub analysis_mode: AnalysisMode,
}

#[derive(Debug, Serialize)]
pub struct GeneratePovResponse {
    pub status: &'static str,
    pub pov_text: Option<String>,
}

// ── Transcription requests ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTranscriptionRequestBody {
    pub document_id: Uuid,
    pub provider: TranscriptionProvider,
    pub model: Option<String>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionRequestDto {
    pub id: Uuid,
    pub document_id: Uuid,
    pub provider: TranscriptionProvider,
    pub model: Option<String>,
    pub start_seconds: Option<f64>,
    pub end_seconds: Option<f64>,
    pub status: JobStatus,
}

impl From<TranscriptionRequestRow> for TranscriptionRequestDto {
    fn from(r: TranscriptionRequestRow) -> Self {
        Self {
            id: r.id,
            document_id: r.document_id,
            provider: r.provider,
            model: r.model,
            start_seconds: r.start_seconds,
            end_seconds: r.end_seconds,
            status: r.status,
        }
    }
}

//! An in-memory [`Store`] for unit-testing `sn-evidence`/`sn-api` without a
//! live Postgres instance. Mirrors `PgStore`'s observable semantics closely
//! enough to exercise the invariants in spec §8 (version snapshots on
//! change, link-mirrors-latest-run, freshness from `updated_at` ordering).

use async_trait::async_trait;
use chrono::Utc;
use sn_common::enums::{FreshnessStatus, TranscriptStatus, Verdict};
use sn_common::{SnError, SnResult};
use sn_db::models::*;
use sn_db::{
    CommitEvidenceItem, CommitEvidenceOutcome, HypothesisPatch, NewDocument, NewHypothesis,
    NewSegment, ReferenceCacheLock, Store,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct FakeState {
    sources: HashMap<Uuid, Source>,
    documents: HashMap<Uuid, Document>,
    segments: HashMap<Uuid, Segment>,
    hypotheses: HashMap<Uuid, Hypothesis>,
    hypothesis_versions: Vec<HypothesisVersion>,
    links: HashMap<(Uuid, Uuid), HypothesisSegmentLink>,
    runs: Vec<HypothesisSegmentLinkRun>,
    questions: HashMap<Uuid, Question>,
    question_links: Vec<(Uuid, Uuid)>,
    reference_cache: HashMap<Uuid, ReferenceCacheEntry>,
    reference_locks: HashMap<Uuid, Arc<Mutex<()>>>,
}

/// In-memory `Store`. Cheaply `Clone`-able; all instances share state.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a source directly, bypassing the (nonexistent) write path —
    /// sources are operator-provisioned, not created through the API.
    pub async fn seed_source(&self, source: Source) {
        self.state.lock().await.sources.insert(source.id, source);
    }

    pub async fn seed_document(&self, document: Document) {
        self.state.lock().await.documents.insert(document.id, document);
    }

    pub async fn seed_segment(&self, segment: Segment) {
        self.state.lock().await.segments.insert(segment.id, segment);
    }

    /// Counts documents currently attributed to `source_id`, for asserting
    /// on what an ingestor run actually wrote.
    pub async fn document_count_for_source(&self, source_id: Uuid) -> usize {
        self.state.lock().await.documents.values().filter(|d| d.source_id == source_id).count()
    }
}

struct FakeReferenceCacheLock {
    _permit: Option<tokio::sync::OwnedMutexGuard<()>>,
}

#[async_trait]
impl ReferenceCacheLock for FakeReferenceCacheLock {
    async fn release(mut self: Box<Self>) -> SnResult<()> {
        self._permit.take();
        Ok(())
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn ping(&self) -> SnResult<()> {
        Ok(())
    }

    async fn list_sources(&self) -> SnResult<Vec<Source>> {
        let mut v: Vec<Source> = self.state.lock().await.sources.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    async fn get_source(&self, id: Uuid) -> SnResult<Source> {
        self.state
            .lock()
            .await
            .sources
            .get(&id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("source {id}")))
    }

    async fn list_active_documents_with_segment_counts(&self) -> SnResult<Vec<(Document, i64)>> {
        let state = self.state.lock().await;
        let mut out: Vec<(Document, i64)> = state
            .documents
            .values()
            .filter(|d| !d.is_archived)
            .map(|d| {
                let count = state.segments.values().filter(|s| s.document_id == d.id).count() as i64;
                (d.clone(), count)
            })
            .collect();
        out.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(out)
    }

    async fn get_document(&self, id: Uuid) -> SnResult<Document> {
        self.state
            .lock()
            .await
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("document {id}")))
    }

    async fn archive_document(&self, id: Uuid) -> SnResult<Document> {
        let mut state = self.state.lock().await;
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| SnError::NotFound(format!("document {id}")))?;
        doc.is_archived = true;
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn upsert_document(&self, new: NewDocument) -> SnResult<Document> {
        let mut state = self.state.lock().await;
        let existing = state
            .documents
            .values()
            .find(|d| d.source_id == new.source_id && d.external_id == new.external_id)
            .map(|d| d.id);

        let now = Utc::now();
        let doc = if let Some(id) = existing {
            let doc = state.documents.get_mut(&id).unwrap();
            doc.title = new.title;
            doc.author = new.author;
            doc.published_at = new.published_at;
            doc.original_url = new.original_url;
            doc.original_media_type = new.original_media_type;
            if new.content_text.is_some() {
                doc.content_text = new.content_text;
            }
            if new.content_html.is_some() {
                doc.content_html = new.content_html;
            }
            doc.updated_at = now;
            doc.clone()
        } else {
            let doc = Document {
                id: Uuid::new_v4(),
                source_id: new.source_id,
                external_id: new.external_id,
                title: new.title,
                author: new.author,
                published_at: new.published_at,
                original_url: new.original_url,
                original_media_type: new.original_media_type,
                content_text: new.content_text,
                content_html: new.content_html,
                assets: new.assets,
                transcript_status: TranscriptStatus::None,
                ingest_status: sn_common::enums::IngestStatus::Pending,
                is_archived: false,
                created_at: now,
                updated_at: now,
            };
            state.documents.insert(doc.id, doc.clone());
            doc
        };
        Ok(doc)
    }

    async fn append_transcript_asset(
        &self,
        document_id: Uuid,
        asset: DocumentAsset,
        full_text: Option<String>,
        status: TranscriptStatus,
    ) -> SnResult<Document> {
        let mut state = self.state.lock().await;
        let doc = state
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| SnError::NotFound(format!("document {document_id}")))?;
        doc.assets.push(asset);
        doc.transcript_status = status;
        if let Some(text) = full_text {
            doc.content_text = Some(text);
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn list_segments(&self) -> SnResult<Vec<(Segment, i64)>> {
        let state = self.state.lock().await;
        let mut out: Vec<(Segment, i64)> = state
            .segments
            .values()
            .map(|s| {
                let count = state
                    .links
                    .values()
                    .filter(|l| l.segment_id == s.id)
                    .count() as i64;
                (s.clone(), count)
            })
            .collect();
        out.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(out)
    }

    async fn list_segments_for_document(&self, document_id: Uuid) -> SnResult<Vec<Segment>> {
        let mut v: Vec<Segment> = self
            .state
            .lock()
            .await
            .segments
            .values()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.start_offset.cmp(&b.start_offset).then(a.created_at.cmp(&b.created_at)));
        Ok(v)
    }

    async fn get_segment_workbench(&self, segment_id: Uuid) -> SnResult<SegmentWorkbench> {
        let state = self.state.lock().await;
        let segment = state
            .segments
            .get(&segment_id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("segment {segment_id}")))?;
        let document = state
            .documents
            .get(&segment.document_id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("document {}", segment.document_id)))?;
        Ok(SegmentWorkbench { segment, document })
    }

    async fn create_segment(&self, new: NewSegment) -> SnResult<Segment> {
        let now = Utc::now();
        let segment = Segment {
            id: Uuid::new_v4(),
            document_id: new.document_id,
            text: new.text,
            content_html: new.content_html,
            start_offset: new.start_offset,
            end_offset: new.end_offset,
            offset_kind: new.offset_kind,
            segment_status: sn_common::enums::SegmentStatus::Raw,
            version: 1,
            labels: new.labels,
            provenance: new.provenance,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.segments.insert(segment.id, segment.clone());
        Ok(segment)
    }

    async fn delete_segment(&self, id: Uuid) -> SnResult<()> {
        let mut state = self.state.lock().await;
        if state.segments.remove(&id).is_none() {
            return Err(SnError::NotFound(format!("segment {id}")));
        }
        state.links.retain(|_, l| l.segment_id != id);
        state.runs.retain(|r| r.segment_id != id);
        Ok(())
    }

    async fn list_hypotheses(&self) -> SnResult<Vec<(Hypothesis, i64)>> {
        let state = self.state.lock().await;
        let mut out: Vec<(Hypothesis, i64)> = state
            .hypotheses
            .values()
            .map(|h| {
                let count = state.links.values().filter(|l| l.hypothesis_id == h.id).count() as i64;
                (h.clone(), count)
            })
            .collect();
        out.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(out)
    }

    async fn get_hypothesis(&self, id: Uuid) -> SnResult<Hypothesis> {
        self.state
            .lock()
            .await
            .hypotheses
            .get(&id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("hypothesis {id}")))
    }

    async fn create_hypothesis(&self, new: NewHypothesis) -> SnResult<Hypothesis> {
        let now = Utc::now();
        let h = Hypothesis {
            id: Uuid::new_v4(),
            hypothesis_text: new.hypothesis_text,
            description: new.description,
            reference_url: new.reference_url,
            reference_type: new.reference_type,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.hypotheses.insert(h.id, h.clone());
        Ok(h)
    }

    async fn update_hypothesis(&self, id: Uuid, patch: HypothesisPatch) -> SnResult<Hypothesis> {
        let mut state = self.state.lock().await;
        let current = state
            .hypotheses
            .get(&id)
            .cloned()
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
            state.hypothesis_versions.push(HypothesisVersion {
                id: Uuid::new_v4(),
                hypothesis_id: current.id,
                hypothesis_text: current.hypothesis_text.clone(),
                description: current.description.clone(),
                reference_url: current.reference_url.clone(),
                reference_type: current.reference_type,
                recorded_at: Utc::now(),
                recorded_by: patch.recorded_by.clone(),
            });
        }

        let updated = state.hypotheses.get_mut(&id).unwrap();
        updated.hypothesis_text = next_text;
        updated.description = next_description;
        updated.reference_url = next_reference_url;
        updated.reference_type = next_reference_type;
        updated.updated_at = Utc::now();
        Ok(updated.clone())
    }

    async fn delete_hypothesis(&self, id: Uuid) -> SnResult<()> {
        let mut state = self.state.lock().await;
        if state.hypotheses.remove(&id).is_none() {
            return Err(SnError::NotFound(format!("hypothesis {id}")));
        }
        state.hypothesis_versions.retain(|v| v.hypothesis_id != id);
        state.links.retain(|_, l| l.hypothesis_id != id);
        state.runs.retain(|r| r.hypothesis_id != id);
        state.question_links.retain(|(_, hid)| *hid != id);
        state.reference_cache.remove(&id);
        Ok(())
    }

    async fn list_hypothesis_versions(&self, hypothesis_id: Uuid) -> SnResult<Vec<HypothesisVersion>> {
        let mut v: Vec<HypothesisVersion> = self
            .state
            .lock()
            .await
            .hypothesis_versions
            .iter()
            .filter(|hv| hv.hypothesis_id == hypothesis_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        Ok(v)
    }

    async fn list_hypotheses_for_segment(&self, segment_id: Uuid) -> SnResult<Vec<HypothesisSegmentLink>> {
        let mut v: Vec<HypothesisSegmentLink> = self
            .state
            .lock()
            .await
            .links
            .values()
            .filter(|l| l.segment_id == segment_id)
            .cloned()
            .collect();
        v.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(v)
    }

    async fn list_evidence_for_hypothesis(&self, hypothesis_id: Uuid) -> SnResult<Vec<EvidenceRow>> {
        let state = self.state.lock().await;
        let hypothesis = state
            .hypotheses
            .get(&hypothesis_id)
            .cloned()
            .ok_or_else(|| SnError::NotFound(format!("hypothesis {hypothesis_id}")))?;

        let mut out = Vec::new();
        for link in state.links.values().filter(|l| l.hypothesis_id == hypothesis_id) {
            let segment = state
                .segments
                .get(&link.segment_id)
                .cloned()
                .ok_or_else(|| SnError::NotFound(format!("segment {}", link.segment_id)))?;
            let document = state.documents.get(&segment.document_id).cloned();
            let freshness_status = if link.updated_at < hypothesis.updated_at {
                FreshnessStatus::Stale
            } else {
                FreshnessStatus::Current
            };
            out.push(EvidenceRow {
                segment_preview: preview(&segment.text),
                document_id: segment.document_id,
                document_title: document.and_then(|d| d.title),
                link: link.clone(),
                freshness_status,
            });
        }
        out.sort_by(|a, b| b.link.updated_at.cmp(&a.link.updated_at));
        Ok(out)
    }

    async fn commit_evidence(
        &self,
        segment_id: Uuid,
        items: Vec<CommitEvidenceItem>,
    ) -> SnResult<Vec<CommitEvidenceOutcome>> {
        let mut state = self.state.lock().await;
        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            let (hypothesis, hypothesis_created) = match item.hypothesis_id {
                None => {
                    let now = Utc::now();
                    let h = Hypothesis {
                        id: Uuid::new_v4(),
                        hypothesis_text: item.hypothesis_text.clone(),
                        description: item.description.clone(),
                        reference_url: None,
                        reference_type: sn_common::enums::ReferenceType::None,
                        created_at: now,
                        updated_at: now,
                    };
                    state.hypotheses.insert(h.id, h.clone());
                    (h, true)
                }
                Some(hid) => {
                    let current = state
                        .hypotheses
                        .get(&hid)
                        .cloned()
                        .ok_or_else(|| SnError::NotFound(format!("hypothesis {hid}")))?;
                    let changed =
                        item.hypothesis_text != current.hypothesis_text || item.description != current.description;
                    if changed {
                        state.hypothesis_versions.push(HypothesisVersion {
                            id: Uuid::new_v4(),
                            hypothesis_id: current.id,
                            hypothesis_text: current.hypothesis_text.clone(),
                            description: current.description.clone(),
                            reference_url: current.reference_url.clone(),
                            reference_type: current.reference_type,
                            recorded_at: Utc::now(),
                            recorded_by: None,
                        });
                        let h = state.hypotheses.get_mut(&hid).unwrap();
                        h.hypothesis_text = item.hypothesis_text.clone();
                        h.description = item.description.clone();
                        h.updated_at = Utc::now();
                        (h.clone(), false)
                    } else {
                        (current, false)
                    }
                }
            };

            let verdict = item.verdict.unwrap_or(Verdict::None);
            let key = (hypothesis.id, segment_id);
            let now = Utc::now();

            let link = match state.links.get_mut(&key) {
                Some(existing) => {
                    existing.verdict = verdict;
                    existing.analysis_text = item.analysis_text.clone();
                    existing.authored_by = Some(item.authored_by);
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let link = HypothesisSegmentLink {
                        id: Uuid::new_v4(),
                        hypothesis_id: hypothesis.id,
                        segment_id,
                        verdict,
                        analysis_text: item.analysis_text.clone(),
                        authored_by: Some(item.authored_by),
                        updated_at: now,
                    };
                    state.links.insert(key, link.clone());
                    link
                }
            };

            let run = HypothesisSegmentLinkRun {
                id: Uuid::new_v4(),
                link_id: link.id,
                hypothesis_id: hypothesis.id,
                segment_id,
                verdict,
                analysis_text: item.analysis_text.clone(),
                authored_by: item.authored_by,
                created_at: now,
                hypothesis_text_snapshot: hypothesis.hypothesis_text.clone(),
                description_snapshot: hypothesis.description.clone(),
                reference_url_snapshot: hypothesis.reference_url.clone(),
                reference_type_snapshot: hypothesis.reference_type,
                hypothesis_updated_at_snapshot: hypothesis.updated_at,
            };
            state.runs.push(run.clone());

            outcomes.push(CommitEvidenceOutcome {
                hypothesis_id: hypothesis.id,
                link,
                run,
                hypothesis_created,
            });
        }

        Ok(outcomes)
    }

    async fn list_questions(&self) -> SnResult<Vec<Question>> {
        let mut v: Vec<Question> = self.state.lock().await.questions.values().cloned().collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(v)
    }

    async fn create_question(&self, question_text: String) -> SnResult<Question> {
        let now = Utc::now();
        let q = Question {
            id: Uuid::new_v4(),
            question_text,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.questions.insert(q.id, q.clone());
        Ok(q)
    }

    async fn delete_question(&self, id: Uuid) -> SnResult<()> {
        let mut state = self.state.lock().await;
        if state.questions.remove(&id).is_none() {
            return Err(SnError::NotFound(format!("question {id}")));
        }
        state.question_links.retain(|(qid, _)| *qid != id);
        Ok(())
    }

    async fn list_hypotheses_for_question(&self, question_id: Uuid) -> SnResult<Vec<Hypothesis>> {
        let state = self.state.lock().await;
        Ok(state
            .question_links
            .iter()
            .filter(|(qid, _)| *qid == question_id)
            .filter_map(|(_, hid)| state.hypotheses.get(hid).cloned())
            .collect())
    }

    async fn link_question_hypothesis(&self, question_id: Uuid, hypothesis_id: Uuid) -> SnResult<()> {
        let mut state = self.state.lock().await;
        let pair = (question_id, hypothesis_id);
        if state.question_links.contains(&pair) {
            return Err(SnError::Conflict(format!(
                "question {question_id} already linked to hypothesis {hypothesis_id}"
            )));
        }
        state.question_links.push(pair);
        Ok(())
    }

    async fn get_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Option<ReferenceCacheEntry>> {
        Ok(self.state.lock().await.reference_cache.get(&hypothesis_id).cloned())
    }

    async fn put_reference_cache(
        &self,
        hypothesis_id: Uuid,
        full_text: String,
        character_count: i32,
    ) -> SnResult<ReferenceCacheEntry> {
        let entry = ReferenceCacheEntry {
            hypothesis_id,
            full_text,
            character_count,
            fetched_at: Utc::now(),
        };
        self.state.lock().await.reference_cache.insert(hypothesis_id, entry.clone());
        Ok(entry)
    }

    async fn lock_reference_cache(&self, hypothesis_id: Uuid) -> SnResult<Box<dyn ReferenceCacheLock>> {
        let mutex = {
            let mut state = self.state.lock().await;
            state.reference_locks.entry(hypothesis_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let permit = mutex.lock_owned().await;
        Ok(Box::new(FakeReferenceCacheLock { _permit: Some(permit) }))
    }
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

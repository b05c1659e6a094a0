//! The evidence engine: the five read/write operations the HTTP API calls
//! into. `suggest` and `analyze` are pure reads against adapters — no
//! `Store` writes happen until `commit_evidence`, which is the only place a
//! `Link`/`Run` pair is ever written, and it never holds a DB transaction
//! open across I/O to an external adapter.

use crate::reference_cache;
use sn_adapters::{AnalyzeRequest, Analyzer, Crawler, ExistingHypothesis, HypothesisSuggestion, Suggester};
use sn_common::enums::AnalysisMode;
use sn_common::SnResult;
use sn_db::store::CommitEvidenceItem;
use sn_db::{CommitEvidenceOutcome, Store};
use sn_db::models::{EvidenceRow, HypothesisSegmentLink};
use std::sync::Arc;
use uuid::Uuid;

/// What `analyze` returns: the raw judgement plus how it was produced, so
/// the caller can tell a reference-grounded verdict from a summary-only one.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    pub verdict: sn_common::enums::Verdict,
    pub analysis_text: String,
    pub analysis_mode: AnalysisMode,
}

/// Input to [`Engine::analyze`] (spec §4.7.2). `hypothesis_id` is only
/// needed to key the reference cache; the text fields stand on their own so
/// callers can analyze a hypothesis that doesn't exist yet (a freshly
/// suggested one, not yet committed).
#[derive(Debug, Clone)]
pub struct AnalyzeParams {
    pub segment_text: String,
    pub hypothesis_text: String,
    pub description: Option<String>,
    pub reference_url: Option<String>,
    pub include_full_reference: bool,
    pub hypothesis_id: Option<Uuid>,
}

/// Wires the `Store` (C1) to the `Suggester`/`Analyzer`/`Crawler` adapters
/// (C3) behind the five operations spec §4.7 describes. Cheaply cloneable —
/// every field is an `Arc`, matching the shared-`AppState` convention this
/// codebase uses for its web handlers.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    suggester: Arc<dyn Suggester>,
    analyzer: Arc<dyn Analyzer>,
    crawler: Arc<dyn Crawler>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        suggester: Arc<dyn Suggester>,
        analyzer: Arc<dyn Analyzer>,
        crawler: Arc<dyn Crawler>,
    ) -> Self {
        Self { store, suggester, analyzer, crawler }
    }

    /// spec §4.7.1: reads segment text and the full hypothesis list, calls
    /// the `Suggester`, and orders the results existing-first by evidence
    /// count descending, then generated. No writes.
    pub async fn suggest(&self, segment_id: Uuid) -> SnResult<Vec<HypothesisSuggestion>> {
        let workbench = self.store.get_segment_workbench(segment_id).await?;
        let hypotheses = self.store.list_hypotheses().await?;

        let mut by_id = std::collections::HashMap::new();
        let existing: Vec<ExistingHypothesis> = hypotheses
            .iter()
            .map(|(h, count)| {
                by_id.insert(h.id, *count);
                ExistingHypothesis { id: h.id, text: h.hypothesis_text.clone(), description: h.description.clone() }
            })
            .collect();

        let mut suggestions = self.suggester.suggest_hypotheses(&workbench.segment.text, &existing).await?;

        suggestions.sort_by_key(|s| match s.hypothesis_id {
            Some(id) => (0i64, -*by_id.get(&id).unwrap_or(&0)),
            None => (1, 0),
        });

        Ok(suggestions)
    }

    /// spec §4.7.2: judges a segment against one hypothesis, optionally
    /// grounded in cached reference text. No writes.
    pub async fn analyze(&self, params: AnalyzeParams) -> SnResult<AnalyzeOutcome> {
        let reference_text = if params.include_full_reference && params.reference_url.is_some() {
            match params.hypothesis_id {
                Some(hid) => {
                    let hypothesis = self.store.get_hypothesis(hid).await?;
                    reference_cache::get_reference_text(&self.store, &self.crawler, &hypothesis).await?
                }
                None => None,
            }
        } else {
            None
        };

        let analysis_mode =
            if reference_text.is_some() { AnalysisMode::FullReference } else { AnalysisMode::Summary };

        let result = self
            .analyzer
            .analyze(AnalyzeRequest {
                segment_text: &params.segment_text,
                hypothesis_text: &params.hypothesis_text,
                description: params.description.as_deref(),
                reference_text: reference_text.as_deref(),
            })
            .await?;

        Ok(AnalyzeOutcome { verdict: result.verdict, analysis_text: result.analysis_text, analysis_mode })
    }

    /// spec §4.7.3 / §4.7.6 / §7: the transactional core. Delegates to
    /// `Store`, which owns the single-transaction guarantee, retrying up to
    /// 3 times with jitter when two commits race on the same
    /// `(hypothesis_id, segment_id)` pair and the `REPEATABLE READ`
    /// transaction loses (Postgres `40001`) — the loser re-reads and re-runs
    /// against whatever the winner left behind, rather than surfacing the
    /// race to the caller. Adapter I/O (suggest/analyze) always happens
    /// outside the write transaction (spec §4.8), so nothing here blocks on
    /// external calls.
    pub async fn commit_evidence(
        &self,
        segment_id: Uuid,
        items: Vec<CommitEvidenceItem>,
    ) -> SnResult<Vec<CommitEvidenceOutcome>> {
        const MAX_RETRIES: u32 = 3;
        let mut attempt = 0;
        loop {
            match self.store.commit_evidence(segment_id, items.clone()).await {
                Ok(outcomes) => return Ok(outcomes),
                Err(e) if e.is_serialization_failure() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let jitter_ms = 20 * attempt + (rand::random::<u8>() % 30) as u32;
                    tracing::warn!(
                        segment_id = %segment_id,
                        attempt,
                        jitter_ms,
                        "commit_evidence lost a serialization race, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(jitter_ms as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// spec §4.7.4: one row per link, enriched with freshness.
    pub async fn list_evidence_for_hypothesis(&self, hypothesis_id: Uuid) -> SnResult<Vec<EvidenceRow>> {
        self.store.list_evidence_for_hypothesis(hypothesis_id).await
    }

    /// spec §4.7.5: current link state for a segment, for workbench
    /// pre-population.
    pub async fn list_hypotheses_for_segment(&self, segment_id: Uuid) -> SnResult<Vec<HypothesisSegmentLink>> {
        self.store.list_hypotheses_for_segment(segment_id).await
    }

    /// spec §6 `GET /hypotheses/{id}/reference`: fetch-or-cached reference
    /// text (C6). `None` means the hypothesis has no `reference_url`, or the
    /// crawler fetch failed and the caller should treat it as absent.
    pub async fn get_reference(&self, hypothesis_id: Uuid) -> SnResult<Option<String>> {
        let hypothesis = self.store.get_hypothesis(hypothesis_id).await?;
        reference_cache::get_reference_text(&self.store, &self.crawler, &hypothesis).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sn_adapters::{AnalyzeResult, AdapterError, CrawlResult};
    use sn_common::enums::{AuthoredBy, SuggestionSource, Verdict};
    use sn_db::store::NewHypothesis;
    use sn_test_utils::builders::{a_document, a_segment, a_source};
    use sn_test_utils::FakeStore;

    struct StubSuggester(Vec<HypothesisSuggestion>);
    #[async_trait]
    impl Suggester for StubSuggester {
        async fn suggest_hypotheses(
            &self,
            _segment_text: &str,
            _existing: &[ExistingHypothesis],
        ) -> Result<Vec<HypothesisSuggestion>, AdapterError> {
            Ok(self.0.clone())
        }
    }

    struct StubAnalyzer {
        verdict: Verdict,
        saw_reference: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }
    #[async_trait]
    impl Analyzer for StubAnalyzer {
        async fn analyze(&self, req: AnalyzeRequest<'_>) -> Result<AnalyzeResult, AdapterError> {
            if req.reference_text.is_some() {
                self.saw_reference.store(true, std::sync::atomic::Ordering::SeqCst);
            }
            Ok(AnalyzeResult { verdict: self.verdict, analysis_text: "because X".to_string() })
        }
    }

    struct StubCrawler(std::sync::atomic::AtomicUsize);
    #[async_trait]
    impl Crawler for StubCrawler {
        async fn fetch_text(&self, _url: &str) -> Result<CrawlResult, AdapterError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(CrawlResult { full_text: "reference body".to_string(), char_count: 14 })
        }
    }

    async fn build_engine() -> (Engine, FakeStore, Uuid) {
        let store = FakeStore::new();
        let source = a_source("feed");
        store.seed_source(source.clone()).await;
        let document = a_document(source.id, "ABCDEFGHIJ");
        store.seed_document(document.clone()).await;
        let segment = a_segment(document.id, "DEF", 3, 6);
        store.seed_segment(segment.clone()).await;

        let suggester = Arc::new(StubSuggester(vec![]));
        let analyzer = Arc::new(StubAnalyzer { verdict: Verdict::Confirms, saw_reference: Default::default() });
        let crawler = Arc::new(StubCrawler(Default::default()));
        let engine = Engine::new(Arc::new(store.clone()), suggester, analyzer, crawler);
        (engine, store, segment.id)
    }

    #[tokio::test]
    async fn suggest_orders_existing_by_evidence_count_then_generated() {
        let (_engine, store, segment_id) = build_engine().await;

        let popular = store
            .create_hypothesis(NewHypothesis {
                hypothesis_text: "popular".into(),
                description: None,
                reference_url: None,
                reference_type: sn_common::enums::ReferenceType::None,
            })
            .await
            .unwrap();
        let quiet = store
            .create_hypothesis(NewHypothesis {
                hypothesis_text: "quiet".into(),
                description: None,
                reference_url: None,
                reference_type: sn_common::enums::ReferenceType::None,
            })
            .await
            .unwrap();

        store
            .commit_evidence(
                segment_id,
                vec![CommitEvidenceItem {
                    hypothesis_id: Some(popular.id),
                    hypothesis_text: "popular".into(),
                    description: None,
                    verdict: Some(Verdict::Confirms),
                    analysis_text: Some("x".into()),
                    authored_by: AuthoredBy::Human,
                }],
            )
            .await
            .unwrap();

        let engine = Engine::new(
            Arc::new(store.clone()),
            Arc::new(StubSuggester(vec![
                HypothesisSuggestion {
                    hypothesis_id: None,
                    hypothesis_text: "brand new".into(),
                    description: None,
                    source: SuggestionSource::Generated,
                },
                HypothesisSuggestion {
                    hypothesis_id: Some(quiet.id),
                    hypothesis_text: "quiet".into(),
                    description: None,
                    source: SuggestionSource::Existing,
                },
                HypothesisSuggestion {
                    hypothesis_id: Some(popular.id),
                    hypothesis_text: "popular".into(),
                    description: None,
                    source: SuggestionSource::Existing,
                },
            ])),
            Arc::new(StubAnalyzer { verdict: Verdict::Confirms, saw_reference: Default::default() }),
            Arc::new(StubCrawler(Default::default())),
        );

        let suggestions = engine.suggest(segment_id).await.unwrap();
        assert_eq!(suggestions[0].hypothesis_text, "popular");
        assert_eq!(suggestions[1].hypothesis_text, "quiet");
        assert_eq!(suggestions[2].hypothesis_text, "brand new");
    }

    #[tokio::test]
    async fn analyze_without_full_reference_is_summary_mode() {
        let (engine, _store, _segment_id) = build_engine().await;
        let outcome = engine
            .analyze(AnalyzeParams {
                segment_text: "DEF".into(),
                hypothesis_text: "H1".into(),
                description: None,
                reference_url: Some("https://example.com/paper".into()),
                include_full_reference: false,
                hypothesis_id: None,
            })
            .await
            .unwrap();
        assert_eq!(outcome.analysis_mode, AnalysisMode::Summary);
    }

    #[tokio::test]
    async fn analyze_with_full_reference_fetches_once_and_grounds_analysis() {
        let store = FakeStore::new();
        let hypothesis = store
            .create_hypothesis(NewHypothesis {
                hypothesis_text: "H1".into(),
                description: None,
                reference_url: Some("https://example.com/paper".into()),
                reference_type: sn_common::enums::ReferenceType::Paper,
            })
            .await
            .unwrap();

        let saw_reference = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let analyzer = Arc::new(StubAnalyzer { verdict: Verdict::Confirms, saw_reference: saw_reference.clone() });
        let crawler = Arc::new(StubCrawler(Default::default()));
        let engine =
            Engine::new(Arc::new(store.clone()), Arc::new(StubSuggester(vec![])), analyzer, crawler.clone());

        let outcome = engine
            .analyze(AnalyzeParams {
                segment_text: "DEF".into(),
                hypothesis_text: "H1".into(),
                description: None,
                reference_url: Some("https://example.com/paper".into()),
                include_full_reference: true,
                hypothesis_id: Some(hypothesis.id),
            })
            .await
            .unwrap();

        assert_eq!(outcome.analysis_mode, AnalysisMode::FullReference);
        assert!(saw_reference.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(crawler.0.load(std::sync::atomic::Ordering::SeqCst), 1);

        // A second call reuses the now-cached entry; still exactly one fetch.
        let outcome2 = engine
            .analyze(AnalyzeParams {
                segment_text: "DEF".into(),
                hypothesis_text: "H1".into(),
                description: None,
                reference_url: Some("https://example.com/paper".into()),
                include_full_reference: true,
                hypothesis_id: Some(hypothesis.id),
            })
            .await
            .unwrap();
        assert_eq!(outcome2.analysis_mode, AnalysisMode::FullReference);
        assert_eq!(crawler.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

//! Reference cache (C6, spec §4.6): serves cached reference text for a
//! hypothesis, refetching through the `Crawler` when the entry is missing or
//! past its TTL. Concurrent callers for the same hypothesis are serialized
//! by a per-hypothesis advisory lock held by the `Store` (§4.6/§9 "double
//! checked locking") so only one fetch is ever issued.

use chrono::{Duration, Utc};
use sn_adapters::Crawler;
use sn_common::enums::ReferenceType;
use sn_db::models::Hypothesis;
use sn_db::Store;
use std::sync::Arc;

fn ttl_for(reference_type: ReferenceType) -> Duration {
    match reference_type {
        ReferenceType::Paper | ReferenceType::Book => Duration::days(30),
        _ => Duration::days(7),
    }
}

fn is_fresh(fetched_at: chrono::DateTime<Utc>, reference_type: ReferenceType) -> bool {
    Utc::now() - fetched_at < ttl_for(reference_type)
}

/// Returns cached/refreshed reference text, or `None` if the hypothesis has
/// no `reference_url`, or if the crawler fetch failed (the caller degrades
/// to a summary-only analysis in that case — this never errors out).
pub async fn get_reference_text(
    store: &Arc<dyn Store>,
    crawler: &Arc<dyn Crawler>,
    hypothesis: &Hypothesis,
) -> sn_common::SnResult<Option<String>> {
    let Some(reference_url) = hypothesis.reference_url.clone() else {
        return Ok(None);
    };

    if let Some(entry) = store.get_reference_cache(hypothesis.id).await? {
        if is_fresh(entry.fetched_at, hypothesis.reference_type) {
            return Ok(Some(entry.full_text));
        }
    }

    let lock = store.lock_reference_cache(hypothesis.id).await?;

    // Re-check: another caller may have refreshed the entry while we waited
    // for the lock.
    if let Some(entry) = store.get_reference_cache(hypothesis.id).await? {
        if is_fresh(entry.fetched_at, hypothesis.reference_type) {
            lock.release().await?;
            return Ok(Some(entry.full_text));
        }
    }

    let fetch_result = crawler.fetch_text(&reference_url).await;
    let text = match fetch_result {
        Ok(result) => {
            let entry = store
                .put_reference_cache(hypothesis.id, result.full_text, result.char_count as i32)
                .await?;
            Some(entry.full_text)
        }
        Err(e) => {
            tracing::warn!(hypothesis_id = %hypothesis.id, error = %e, "reference fetch failed, degrading to summary-only");
            None
        }
    };

    lock.release().await?;
    Ok(text)
}

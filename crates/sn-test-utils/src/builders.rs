//! Minimal builders for row types, with sane defaults so a test only sets
//! the fields it actually cares about.

use chrono::Utc;
use sn_common::enums::{IngestStatus, SourceType, TranscriptStatus};
use sn_db::models::{Document, Segment, Source};
use uuid::Uuid;

pub fn a_source(name: &str) -> Source {
    let now = Utc::now();
    Source {
        id: Uuid::new_v4(),
        name: name.to_string(),
        source_type: SourceType::Rss,
        feed_url: Some(format!("https://example.com/{name}.xml")),
        is_active: true,
        poll_cadence_secs: Some(300),
        created_at: now,
        updated_at: now,
    }
}

pub fn a_document(source_id: Uuid, content_text: &str) -> Document {
    let now = Utc::now();
    Document {
        id: Uuid::new_v4(),
        source_id,
        external_id: Uuid::new_v4().to_string(),
        title: Some("untitled".to_string()),
        author: None,
        published_at: Some(now),
        original_url: None,
        original_media_type: None,
        content_text: Some(content_text.to_string()),
        content_html: None,
        assets: Vec::new(),
        transcript_status: TranscriptStatus::None,
        ingest_status: IngestStatus::Ok,
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}

pub fn a_segment(document_id: Uuid, text: &str, start_offset: i32, end_offset: i32) -> Segment {
    let now = Utc::now();
    Segment {
        id: Uuid::new_v4(),
        document_id,
        text: text.to_string(),
        content_html: None,
        start_offset: Some(start_offset),
        end_offset: Some(end_offset),
        offset_kind: Some(sn_common::enums::OffsetKind::Text),
        segment_status: sn_common::enums::SegmentStatus::Raw,
        version: 1,
        labels: Vec::new(),
        provenance: None,
        created_at: now,
        updated_at: now,
    }
}

//! Request-body validation shared across handlers. Every helper here maps a
//! bad input to [`sn_common::SnError::Validation`] (spec §7) — nothing else
//! in this crate constructs that variant directly from raw field checks.

use sn_common::enums::OffsetKind;
use sn_common::{SnError, SnResult};

/// Invariant 6 (spec §8): when both offsets are present and `offset_kind`
/// is `text` (the default for a UI-selection segment), `0 <= start < end <=
/// len(document.content_text)`.
pub fn validate_text_offsets(
    start_offset: Option<i32>,
    end_offset: Option<i32>,
    offset_kind: OffsetKind,
    content_text: Option<&str>,
) -> SnResult<()> {
    if offset_kind != OffsetKind::Text {
        return Ok(());
    }
    let (Some(start), Some(end)) = (start_offset, end_offset) else {
        return Ok(());
    };
    if start < 0 || start >= end {
        return Err(SnError::Validation(format!(
            "start_offset ({start}) must be non-negative and less than end_offset ({end})"
        )));
    }
    let len = content_text.map(|t| t.chars().count()).unwrap_or(0) as i32;
    if end > len {
        return Err(SnError::Validation(format!(
            "end_offset ({end}) exceeds document content length ({len})"
        )));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> SnResult<()> {
    if value.trim().is_empty() {
        return Err(SnError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_offsets_within_bounds() {
        assert!(validate_text_offsets(Some(3), Some(6), OffsetKind::Text, Some("ABCDEFGHIJ")).is_ok());
    }

    #[test]
    fn rejects_end_past_content_length() {
        assert!(validate_text_offsets(Some(3), Some(16), OffsetKind::Text, Some("ABCDEFGHIJ")).is_err());
    }

    #[test]
    fn rejects_start_not_less_than_end() {
        assert!(validate_text_offsets(Some(6), Some(6), OffsetKind::Text, Some("ABCDEFGHIJ")).is_err());
    }

    #[test]
    fn skips_check_for_non_text_offset_kind() {
        assert!(validate_text_offsets(Some(3), Some(6000), OffsetKind::Seconds, Some("ABC")).is_ok());
    }
}

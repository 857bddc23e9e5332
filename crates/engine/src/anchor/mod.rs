// Selection capture and anchor re-resolution.
//
// Offsets are cheap but brittle under edits earlier in the block; the
// captured text is robust to shifts but breaks when the span itself was
// edited away. Resolution tries the offset fast path first and falls
// back to exact substring search, preferring the occurrence nearest the
// last known position.

use anchorage_common::error::CaptureError;
use anchorage_common::text::{trim_with_offset, utf16_len, utf16_occurrences, utf16_slice};
use anchorage_common::types::{Anchor, MarkerPosition, SelectionSnapshot};

use crate::document::DocumentModel;

/// Captured text shorter than this (UTF-16 units) is too ambiguous for
/// the substring fallback and orphans instead.
pub const DEFAULT_MIN_CAPTURED_LEN: u32 = 3;

/// Resolver tuning, sourced from [`crate::config::EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub min_captured_len: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { min_captured_len: DEFAULT_MIN_CAPTURED_LEN }
    }
}

/// Outcome of re-resolving one anchor against the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The span was found; threads render at this position.
    Ok(MarkerPosition),
    /// The captured text can no longer be found in its block. A steady
    /// state, not an error: the thread stays listed without a marker and
    /// recovers automatically if the text reappears.
    Orphaned,
}

impl Resolution {
    pub fn position(&self) -> Option<MarkerPosition> {
        match self {
            Self::Ok(position) => Some(*position),
            Self::Orphaned => None,
        }
    }
}

/// Converts selections into persistent anchors and re-resolves them
/// after edits.
#[derive(Debug, Clone, Default)]
pub struct AnchorResolver {
    config: ResolverConfig,
}

impl AnchorResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Captures a live selection as a persistent anchor.
    ///
    /// The raw selection must carry a well-ordered marker, be non-empty
    /// after trimming, and sit in exactly one block; the stored marker
    /// is tightened to the trimmed span so the offset fast path and the
    /// text fallback agree.
    pub fn capture(&self, selection: &SelectionSnapshot) -> Result<Anchor, CaptureError> {
        if selection.marker.to < selection.marker.from {
            return Err(CaptureError::InvertedSelection(
                selection.marker.from,
                selection.marker.to,
            ));
        }
        let (captured, leading) = trim_with_offset(&selection.selected_text);
        if captured.is_empty() {
            return Err(CaptureError::EmptySelection);
        }
        if selection.block_ids.len() != 1 {
            return Err(CaptureError::CrossBlockSelection(selection.block_ids.len()));
        }

        let from = selection.marker.from + leading;
        let to = from + utf16_len(captured);
        Ok(Anchor {
            block_id: selection.block_ids[0].clone(),
            marker: MarkerPosition::new(from, to),
            captured_text: captured.to_owned(),
        })
    }

    /// Re-resolves an anchor against the current document model.
    ///
    /// In order: block lookup, exact offset fast path, then exact
    /// substring search with the nearest-occurrence tie-break. Captured
    /// text below the configured minimum never falls back to search.
    pub fn resolve(&self, anchor: &Anchor, doc: &DocumentModel) -> Resolution {
        let Some(block) = doc.find_block(&anchor.block_id) else {
            return Resolution::Orphaned;
        };
        let text = block.text();

        // Fast path: offsets still hold, O(span length).
        if utf16_slice(&text, anchor.marker.from, anchor.marker.to)
            .is_some_and(|span| span == anchor.captured_text)
        {
            return Resolution::Ok(anchor.marker);
        }

        let captured_len = utf16_len(&anchor.captured_text);
        if captured_len < self.config.min_captured_len {
            return Resolution::Orphaned;
        }

        let occurrences = utf16_occurrences(&text, &anchor.captured_text);
        let nearest = occurrences.into_iter().min_by_key(|&from| {
            let last_known = i64::from(anchor.marker.from);
            (i64::from(from) - last_known).abs()
        });

        match nearest {
            Some(from) => Resolution::Ok(MarkerPosition::new(from, from + captured_len)),
            None => Resolution::Orphaned,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use anchorage_common::types::Block;

    fn doc_with(text: &str) -> DocumentModel {
        DocumentModel::new("doc-1", vec![Block::paragraph("b1", text)])
            .expect("doc should build")
    }

    fn resolver() -> AnchorResolver {
        AnchorResolver::default()
    }

    fn anchor(from: u32, to: u32, captured: &str) -> Anchor {
        Anchor {
            block_id: "b1".to_owned(),
            marker: MarkerPosition::new(from, to),
            captured_text: captured.to_owned(),
        }
    }

    #[test]
    fn capture_trims_and_tightens_marker() {
        let selection = SelectionSnapshot::single(" quick ", "b1", 3, 10);
        let anchor = resolver().capture(&selection).expect("capture should succeed");
        assert_eq!(anchor.captured_text, "quick");
        assert_eq!(anchor.marker, MarkerPosition::new(4, 9));
        assert_eq!(anchor.block_id, "b1");
    }

    #[test]
    fn capture_rejects_empty_selection() {
        let selection = SelectionSnapshot::single("   ", "b1", 0, 3);
        let error = resolver().capture(&selection).expect_err("capture should fail");
        assert_eq!(error, CaptureError::EmptySelection);
    }

    #[test]
    fn capture_rejects_inverted_marker() {
        // A backwards selection from the editing surface is rejected,
        // not asserted on.
        let selection = SelectionSnapshot::single("quick", "b1", 9, 4);
        let error = resolver().capture(&selection).expect_err("capture should fail");
        assert_eq!(error, CaptureError::InvertedSelection(9, 4));
    }

    #[test]
    fn capture_rejects_cross_block_selection() {
        let mut selection = SelectionSnapshot::single("quick fox and more", "b1", 4, 22);
        selection.block_ids.push("b2".to_owned());
        let error = resolver().capture(&selection).expect_err("capture should fail");
        assert_eq!(error, CaptureError::CrossBlockSelection(2));
    }

    // Capturing the same selection twice yields anchors that resolve
    // identically on an unmodified document.
    #[test]
    fn capture_is_idempotent() {
        let doc = doc_with("The quick fox");
        let selection = SelectionSnapshot::single("quick", "b1", 4, 9);
        let resolver = resolver();

        let first = resolver.capture(&selection).expect("capture should succeed");
        let second = resolver.capture(&selection).expect("capture should succeed");
        assert_eq!(first, second);
        assert_eq!(resolver.resolve(&first, &doc), resolver.resolve(&second, &doc));
    }

    #[test]
    fn offset_fast_path_returns_position_unchanged() {
        let doc = doc_with("The quick fox");
        let anchor = anchor(4, 9, "quick");

        let resolution = resolver().resolve(&anchor, &doc);
        assert_eq!(resolution, Resolution::Ok(MarkerPosition::new(4, 9)));

        // The substring at the returned position equals the captured text.
        let position = resolution.position().expect("position should exist");
        let text = doc.block_text("b1").expect("block should exist");
        assert_eq!(
            anchorage_common::text::utf16_slice(&text, position.from, position.to),
            Some("quick")
        );
    }

    #[test]
    fn shifted_text_is_recovered_by_search() {
        // "very " inserted at offset 4 shifts the span right by 5.
        let doc = doc_with("The very quick fox");
        let anchor = anchor(4, 9, "quick");

        let resolution = resolver().resolve(&anchor, &doc);
        assert_eq!(resolution, Resolution::Ok(MarkerPosition::new(9, 14)));
    }

    #[test]
    fn deleted_span_orphans() {
        let doc = doc_with("Nothing matches");
        let anchor = anchor(4, 9, "quick");
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Orphaned);
    }

    #[test]
    fn missing_block_orphans() {
        let doc = doc_with("The quick fox");
        let mut anchor = anchor(4, 9, "quick");
        anchor.block_id = "gone".to_owned();
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Orphaned);
    }

    #[test]
    fn short_captured_text_does_not_fall_back_to_search() {
        let doc = doc_with("xaxbxc");
        // "a" still occurs, but a 1-unit needle is too ambiguous.
        let anchor = anchor(4, 5, "a");
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Orphaned);
    }

    #[test]
    fn short_captured_text_still_resolves_via_fast_path() {
        let doc = doc_with("xaxbxc");
        let anchor = anchor(1, 2, "a");
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Ok(MarkerPosition::new(1, 2)));
    }

    #[test]
    fn tie_break_prefers_occurrence_nearest_last_known_position() {
        let doc = doc_with("abc abc abc abc");
        // Occurrences at 0, 4, 8, 12; last known from = 9.
        let anchor = anchor(9, 12, "abc");
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Ok(MarkerPosition::new(8, 11)));
    }

    #[test]
    fn resolves_utf16_offsets_across_non_bmp_text() {
        let doc = doc_with("🙂🙂 quick fox");
        // Each emoji is two UTF-16 units; "quick" starts at 5.
        let anchor = anchor(0, 5, "quick");
        assert_eq!(resolver().resolve(&anchor, &doc), Resolution::Ok(MarkerPosition::new(5, 10)));
    }

    proptest! {
        // Inserting an arbitrary prefix before the span never orphans a
        // long-enough unique anchor, and the recovered substring still
        // equals the captured text.
        #[test]
        fn prefix_insertion_preserves_resolution(prefix in "[a-m]{0,24}") {
            let captured = "needle";
            let original = format!("xyz {captured} xyz");
            let edited = format!("{prefix}{original}");
            let doc = doc_with(&edited);

            let anchor = anchor(4, 10, captured);
            let resolution = resolver().resolve(&anchor, &doc);
            let position = resolution.position().expect("anchor should survive prefix insert");

            let text = doc.block_text("b1").expect("block should exist");
            prop_assert_eq!(
                anchorage_common::text::utf16_slice(&text, position.from, position.to),
                Some(captured)
            );
        }
    }
}

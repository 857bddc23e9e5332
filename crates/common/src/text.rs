// UTF-16 offset helpers.
//
// Editing surfaces address block text in UTF-16 code units, while Rust
// strings are UTF-8. Everything that touches a `MarkerPosition` converts
// through here. An offset that lands inside a surrogate pair is invalid
// and maps to `None`.

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|ch| ch.len_utf16() as u32).sum()
}

/// Byte index corresponding to a UTF-16 offset, or `None` when the
/// offset is out of range or splits a surrogate pair.
pub fn utf16_to_byte(text: &str, offset: u32) -> Option<usize> {
    let mut units = 0u32;
    for (byte_idx, ch) in text.char_indices() {
        if units == offset {
            return Some(byte_idx);
        }
        if units > offset {
            return None;
        }
        units += ch.len_utf16() as u32;
    }
    (units == offset).then_some(text.len())
}

/// The substring at `[from, to)` in UTF-16 code units, or `None` when
/// the span is out of range or misaligned.
pub fn utf16_slice(text: &str, from: u32, to: u32) -> Option<&str> {
    if to < from {
        return None;
    }
    let start = utf16_to_byte(text, from)?;
    let end = utf16_to_byte(text, to)?;
    Some(&text[start..end])
}

/// UTF-16 start offsets of every occurrence of `needle` in `haystack`,
/// in ascending order. Matching is exact and case-sensitive.
pub fn utf16_occurrences(haystack: &str, needle: &str) -> Vec<u32> {
    if needle.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut byte_idx = 0usize;
    let mut units = 0u32;
    while byte_idx <= haystack.len().saturating_sub(needle.len()) {
        if haystack[byte_idx..].starts_with(needle) {
            found.push(units);
        }
        match haystack[byte_idx..].chars().next() {
            Some(ch) => {
                byte_idx += ch.len_utf8();
                units += ch.len_utf16() as u32;
            }
            None => break,
        }
    }
    found
}

/// Trims leading/trailing whitespace and reports how many UTF-16 units
/// were removed from the front. Used to tighten a raw selection to the
/// span the anchor actually stores.
pub fn trim_with_offset(text: &str) -> (&str, u32) {
    let trimmed_start = text.trim_start();
    let removed = utf16_len(&text[..text.len() - trimmed_start.len()]);
    (trimmed_start.trim_end(), removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_len_counts_surrogate_pairs() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("🙂"), 2);
        assert_eq!(utf16_len("a🙂b"), 4);
    }

    #[test]
    fn utf16_to_byte_maps_boundaries() {
        let text = "a🙂b";
        assert_eq!(utf16_to_byte(text, 0), Some(0));
        assert_eq!(utf16_to_byte(text, 1), Some(1));
        assert_eq!(utf16_to_byte(text, 3), Some(5));
        assert_eq!(utf16_to_byte(text, 4), Some(6));
        assert_eq!(utf16_to_byte(text, 5), None);
        // Inside the surrogate pair.
        assert_eq!(utf16_to_byte(text, 2), None);
    }

    #[test]
    fn utf16_slice_extracts_spans() {
        assert_eq!(utf16_slice("The quick fox", 4, 9), Some("quick"));
        assert_eq!(utf16_slice("a🙂b", 1, 3), Some("🙂"));
        assert_eq!(utf16_slice("abc", 2, 1), None);
        assert_eq!(utf16_slice("abc", 0, 9), None);
    }

    #[test]
    fn occurrences_reports_utf16_starts() {
        assert_eq!(utf16_occurrences("ababa", "aba"), vec![0, 2]);
        assert_eq!(utf16_occurrences("🙂x🙂x", "x"), vec![2, 5]);
        assert_eq!(utf16_occurrences("abc", "zz"), Vec::<u32>::new());
        assert_eq!(utf16_occurrences("abc", ""), Vec::<u32>::new());
    }

    #[test]
    fn trim_with_offset_reports_leading_units() {
        assert_eq!(trim_with_offset("  quick "), ("quick", 2));
        assert_eq!(trim_with_offset("quick"), ("quick", 0));
        assert_eq!(trim_with_offset("   "), ("", 3));
    }
}

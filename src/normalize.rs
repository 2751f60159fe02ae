// src/normalize.rs
//! Text canonicalization shared by every matcher.
//!
//! Output alphabet is `[a-z0-9 ]`: lowercase, accents stripped, any other
//! character replaced by a space, whitespace collapsed and trimmed.
//! `normalize_text(normalize_text(x)) == normalize_text(x)` for every input.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize raw text for matching ("Roatán!!" -> "roatan").
pub fn normalize_text(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    // 1) Lowercase, then decompose (NFKD) and drop combining marks
    let lowered = s.to_lowercase();
    let stripped = lowered.nfkd().filter(|c| !is_combining_mark(*c));

    // 2) Anything outside [a-z0-9] becomes a separator
    let spaced: String = stripped
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    // 3) Collapse whitespace + trim
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable id for a name: normalized, spaces replaced by hyphens ("Costa Maya" -> "costa-maya").
pub fn slugify(name: &str) -> String {
    normalize_text(name).replace(' ', "-")
}

/// Byte span of the first occurrence of `needle` in `haystack` that is not
/// immediately preceded or followed by an ASCII alphanumeric.
///
/// Both sides are expected to be normalized already.
pub fn find_bounded(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let bytes = haystack.as_bytes();
    let mut from = 0;
    // every start position is tried, so a rejected hit cannot hide an overlapping one
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return Some((start, end));
        }
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_punctuation() {
        assert_eq!(normalize_text("Roatán!!"), "roatan");
        assert_eq!(normalize_text("Roatán!!"), normalize_text("roatan"));
        assert_eq!(normalize_text("  St. Maarten -- Philipsburg "), "st maarten philipsburg");
    }

    #[test]
    fn empty_and_symbol_only_inputs() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("!!! ??? ..."), "");
        assert_eq!(normalize_text("\t\n \u{00A0}"), "");
    }

    #[test]
    fn underscores_and_non_latin_become_separators() {
        assert_eq!(normalize_text("wi_fi"), "wi fi");
        assert_eq!(normalize_text("Café 東京 Cozumel"), "cafe cozumel");
    }

    #[test]
    fn slug_uses_hyphens() {
        assert_eq!(slugify("Costa Maya"), "costa-maya");
        assert_eq!(slugify("Wonder of the Seas"), "wonder-of-the-seas");
        assert_eq!(slugify("Puerto Vallarta, Mexico"), "puerto-vallarta-mexico");
    }

    #[test]
    fn bounded_find_respects_word_edges() {
        assert_eq!(find_bounded("royalty cruise", "royal"), None);
        assert_eq!(find_bounded("the royal way", "royal"), Some((4, 9)));
        // first occurrence is embedded, second one qualifies
        assert_eq!(find_bounded("mayan maya", "maya"), Some((6, 10)));
        assert_eq!(find_bounded("anything", ""), None);
    }

    #[test]
    fn bounded_find_retries_inside_rejected_hit() {
        // "ab ab" first hits at 1 (glued to "x"); the valid hit at 4 overlaps it
        assert_eq!(find_bounded("xab ab ab", "ab ab"), Some((4, 9)));
        assert_eq!(find_bounded("xbora bora bora", "bora bora"), Some((6, 15)));
        assert_eq!(find_bounded("xab ab abx", "ab ab"), None);
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

use crate::NO_DATE;

/// A plausible publication year: 19xx or 20xx.
pub(crate) static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First 19xx/20xx year found anywhere in `text`.
pub fn find_year(text: &str) -> Option<&str> {
    YEAR_RE.find(text).map(|m| m.as_str())
}

/// Whether `s` is a valid year field: exactly four ASCII digits or `n.d.`.
pub fn is_year_token(s: &str) -> bool {
    (s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())) || s.eq_ignore_ascii_case(NO_DATE)
}

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// The first `max_chars` characters of `text`, never splitting a code point.
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_find_year() {
        assert_eq!(find_year("Proceedings 2019, vol 3"), Some("2019"));
        assert_eq!(find_year("printed 1887"), None);
        assert_eq!(find_year("no digits"), None);
    }

    #[test]
    fn test_is_year_token() {
        assert!(is_year_token("2020"));
        assert!(is_year_token("n.d."));
        assert!(is_year_token("N.D."));
        assert!(!is_year_token("20201"));
        assert!(!is_year_token("May 2020"));
        assert!(!is_year_token(""));
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("\u{FB01}nite \u{FB02}ow"), "finite flow");
    }

    #[test]
    fn test_clip_chars_respects_code_points() {
        assert_eq!(clip_chars("héllo", 2), "hé");
        assert_eq!(clip_chars("abc", 10), "abc");
        assert_eq!(clip_chars("abc", 0), "");
    }
}

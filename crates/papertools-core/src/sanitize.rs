use unicode_normalization::UnicodeNormalization;

/// Default cap on a single sanitized component, leaving room for the rest of
/// the composed file name within common path limits.
pub const DEFAULT_MAX_LEN: usize = 100;

/// Characters that are invalid in a file name on at least one major platform.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make `name` safe to embed in a single path component.
///
/// NFC-normalizes, replaces forbidden and control characters (U+0000..U+001F)
/// with `_`, strips trailing dots and spaces, then truncates to `max_len`
/// characters and strips trailing whitespace again. Case and all other
/// characters are preserved. The result may be empty.
pub fn sanitize_component(name: &str, max_len: usize) -> String {
    let replaced: String = name
        .nfc()
        .map(|c| {
            if FORBIDDEN.contains(&c) || (c as u32) < 0x20 {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']);

    if trimmed.chars().count() > max_len {
        let truncated: String = trimmed.chars().take(max_len).collect();
        truncated.trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_forbidden_characters() {
        assert_eq!(
            sanitize_component(r#"a<b>c:d"e/f\g|h?i*j"#, DEFAULT_MAX_LEN),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn test_replaces_control_characters() {
        assert_eq!(sanitize_component("line\none\ttab\u{0}", 100), "line_one_tab_");
    }

    #[test]
    fn test_strips_trailing_dots_and_spaces_repeatedly() {
        assert_eq!(sanitize_component("Title. . ..  ", 100), "Title");
        assert_eq!(sanitize_component("...", 100), "");
    }

    #[test]
    fn test_keeps_leading_and_inner_punctuation() {
        assert_eq!(sanitize_component(" .A. B", 100), " .A. B");
    }

    #[test]
    fn test_preserves_case_and_unicode() {
        assert_eq!(sanitize_component("Müller Ünïcödé", 100), "Müller Ünïcödé");
    }

    #[test]
    fn test_composes_decomposed_input() {
        let decomposed = "Mu\u{0308}ller";
        assert_eq!(sanitize_component(decomposed, 100), "M\u{00FC}ller");
    }

    #[test]
    fn test_truncates_to_max_len_and_trims() {
        let out = sanitize_component("abcd efgh", 5);
        assert_eq!(out, "abcd");
        assert!(out.chars().count() <= 5);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let out = sanitize_component("ééééé", 3);
        assert_eq!(out, "ééé");
    }

    #[test]
    fn test_never_emits_forbidden_or_control() {
        let nasty: String = (0u32..0x80).filter_map(char::from_u32).collect();
        let out = sanitize_component(&nasty, 1000);
        assert!(!out.chars().any(|c| FORBIDDEN.contains(&c) || (c as u32) < 0x20));
    }

    #[test]
    fn test_long_input_bounded() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_component(&long, DEFAULT_MAX_LEN).chars().count(), 100);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_component("", 100), "");
    }
}

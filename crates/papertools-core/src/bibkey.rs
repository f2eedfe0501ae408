use std::fmt;

use crate::BibliographicRecord;

/// Citation key: `surname + year + first title word`, lowercased, with every
/// character outside `[a-z0-9]` removed.
///
/// Deterministic but not collision-free: two papers by the same author in
/// the same year whose titles start with the same word share a key.
pub fn build_key(record: &BibliographicRecord) -> String {
    let first_word = record
        .title
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "paper".to_string());

    format!("{}{}{}", record.surname.to_lowercase(), record.year, first_word)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// A single `@article` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub record: BibliographicRecord,
}

impl BibEntry {
    pub fn new(record: BibliographicRecord) -> Self {
        Self {
            key: build_key(&record),
            record,
        }
    }
}

impl fmt::Display for BibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@article{{{},", self.key)?;
        writeln!(f, "author = {{{}}},", self.record.surname)?;
        writeln!(f, "title  = {{{}}},", self.record.title)?;
        writeln!(f, "year   = {{{}}}", self.record.year)?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(s: &str, t: &str, y: &str) -> BibliographicRecord {
        BibliographicRecord::new(s, t, y)
    }

    #[test]
    fn test_key_basic() {
        assert_eq!(
            build_key(&rec("Smith", "Deep Learning Basics", "2020")),
            "smith2020deep"
        );
    }

    #[test]
    fn test_key_no_date() {
        assert_eq!(build_key(&rec("Jones", "A Survey", "n.d.")), "jonesnda");
    }

    #[test]
    fn test_key_empty_title_uses_paper() {
        assert_eq!(build_key(&rec("Lee", "   ", "2019")), "lee2019paper");
    }

    #[test]
    fn test_key_strips_non_ascii_and_punctuation() {
        assert_eq!(
            build_key(&rec("O'Brien-Müller", "Über: Graphs", "2001")),
            "obrienmller2001ber"
        );
    }

    #[test]
    fn test_key_only_lowercase_alnum() {
        let key = build_key(&rec("ÅNGSTRÖM", "X-Ray_Crystallography!", "1999"));
        assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_key_is_deterministic() {
        let r = rec("Vaswani", "Attention Is All You Need", "2017");
        assert_eq!(build_key(&r), build_key(&r.clone()));
    }

    #[test]
    fn test_entry_format() {
        let entry = BibEntry::new(rec("Smith", "Deep Learning Basics", "2020"));
        assert_eq!(
            entry.to_string(),
            "@article{smith2020deep,\n\
             author = {Smith},\n\
             title  = {Deep Learning Basics},\n\
             year   = {2020}\n\
             }\n"
        );
    }
}

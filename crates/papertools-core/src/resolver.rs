use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::backend::{BackendError, DocumentBackend, EmbeddedMetadata};
use crate::inference::{InferenceError, InferredMetadata, MetadataService};
use crate::text::{clip_chars, collapse_whitespace, find_year, is_year_token};
use crate::{BibliographicRecord, Config, NO_DATE};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("text extraction failed: {0}")]
    Backend(#[from] BackendError),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Embedded,
    Inference,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataSource::Embedded => "embedded",
            MetadataSource::Inference => "inference",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: BibliographicRecord,
    pub source: MetadataSource,
}

/// Result of looking at the document's own metadata.
#[derive(Debug)]
pub enum EmbeddedOutcome {
    /// Title and author both present.
    Complete(BibliographicRecord),
    /// Only one of title/author present.
    Incomplete { has_title: bool, has_author: bool },
    /// Neither present.
    Absent,
    /// The document could not be read.
    Malformed(BackendError),
}

/// Turn embedded title/author into a record when both are present.
///
/// The surname is the last whitespace-separated token of the author field;
/// the year is the first 19xx/20xx found in the title, then the author.
pub fn classify_embedded(meta: &EmbeddedMetadata) -> EmbeddedOutcome {
    let title = meta
        .title
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty());
    let author = meta
        .author
        .as_deref()
        .map(collapse_whitespace)
        .filter(|a| !a.is_empty());

    match (title, author) {
        (Some(title), Some(author)) => {
            let surname = author.split_whitespace().last().unwrap_or_default().to_string();
            let year = find_year(&title)
                .or_else(|| find_year(&author))
                .unwrap_or(NO_DATE)
                .to_string();
            EmbeddedOutcome::Complete(BibliographicRecord {
                surname,
                title,
                year,
            })
        }
        (None, None) => EmbeddedOutcome::Absent,
        (title, author) => EmbeddedOutcome::Incomplete {
            has_title: title.is_some(),
            has_author: author.is_some(),
        },
    }
}

/// Join trimmed page lines until the first line containing the word
/// "Abstract" (any case). That line and everything after it are dropped.
pub fn collect_front_matter(pages: &[String]) -> String {
    static ABSTRACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\babstract\b").unwrap());

    let mut collected = Vec::new();
    for page in pages {
        for line in page.lines() {
            if ABSTRACT_RE.is_match(line) {
                return collected.join("\n");
            }
            collected.push(line.trim());
        }
    }
    collected.join("\n")
}

/// Apply defaults to an inference answer: "Unknown" surname, "Untitled"
/// title, and a year coerced to four digits or `n.d.`.
pub fn record_from_inferred(meta: InferredMetadata) -> BibliographicRecord {
    let surname = meta
        .authors
        .and_then(|authors| authors.into_iter().next())
        .unwrap_or_else(|| "Unknown".to_string());
    let title = meta.title.unwrap_or_else(|| "Untitled".to_string());
    let year = match meta.year {
        Some(y) if y.eq_ignore_ascii_case(NO_DATE) => NO_DATE.to_string(),
        Some(y) if is_year_token(&y) => y,
        Some(y) => find_year(&y).unwrap_or(NO_DATE).to_string(),
        None => NO_DATE.to_string(),
    };
    BibliographicRecord {
        surname,
        title,
        year,
    }
}

/// Resolves a PDF to a [`BibliographicRecord`]: embedded metadata first,
/// then front-matter text sent to the inference service.
pub struct MetadataResolver<'a> {
    backend: &'a dyn DocumentBackend,
    service: &'a dyn MetadataService,
    max_pages: usize,
    max_prompt_chars: usize,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(
        backend: &'a dyn DocumentBackend,
        service: &'a dyn MetadataService,
        config: &Config,
    ) -> Self {
        Self {
            backend,
            service,
            max_pages: config.max_pages,
            max_prompt_chars: config.max_prompt_chars,
        }
    }

    pub fn embedded(&self, path: &Path) -> EmbeddedOutcome {
        match self.backend.embedded_metadata(path) {
            Ok(meta) => classify_embedded(&meta),
            Err(e) => EmbeddedOutcome::Malformed(e),
        }
    }

    /// Front-matter text, clipped to the prompt budget.
    pub fn front_matter(&self, path: &Path) -> Result<String, BackendError> {
        let pages = self.backend.page_texts(path, self.max_pages)?;
        let text = collect_front_matter(&pages);
        Ok(clip_chars(&text, self.max_prompt_chars).to_string())
    }

    pub async fn resolve(&self, path: &Path) -> Result<Resolution, ResolveError> {
        let file = path.display();

        match self.embedded(path) {
            EmbeddedOutcome::Complete(record) => {
                tracing::debug!(file = %file, source = "embedded", "resolved metadata");
                return Ok(Resolution {
                    record,
                    source: MetadataSource::Embedded,
                });
            }
            EmbeddedOutcome::Incomplete {
                has_title,
                has_author,
            } => {
                tracing::debug!(file = %file, has_title, has_author, "embedded metadata incomplete");
            }
            EmbeddedOutcome::Absent => {
                tracing::debug!(file = %file, "no embedded metadata");
            }
            EmbeddedOutcome::Malformed(e) => {
                tracing::debug!(file = %file, error = %e, "embedded metadata unreadable");
            }
        }

        let text = self.front_matter(path)?;
        tracing::debug!(
            file = %file,
            service = self.service.name(),
            chars = text.chars().count(),
            "falling back to inference"
        );
        let meta = self.service.infer(&text).await?;
        Ok(Resolution {
            record: record_from_inferred(meta),
            source: MetadataSource::Inference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: Option<&str>, author: Option<&str>) -> EmbeddedMetadata {
        EmbeddedMetadata {
            title: title.map(str::to_string),
            author: author.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_complete() {
        match classify_embedded(&meta(Some("Graph Theory 2012"), Some("Jane Q. Doe"))) {
            EmbeddedOutcome::Complete(r) => {
                assert_eq!(r.surname, "Doe");
                assert_eq!(r.title, "Graph Theory 2012");
                assert_eq!(r.year, "2012");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_year_from_author_field() {
        match classify_embedded(&meta(Some("Graph Theory"), Some("(c) 1998 Jane Doe"))) {
            EmbeddedOutcome::Complete(r) => {
                assert_eq!(r.year, "1998");
                assert_eq!(r.surname, "Doe");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_no_year() {
        match classify_embedded(&meta(Some("Graph Theory"), Some("Doe"))) {
            EmbeddedOutcome::Complete(r) => assert_eq!(r.year, "n.d."),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_incomplete_and_absent() {
        assert!(matches!(
            classify_embedded(&meta(Some("Title"), None)),
            EmbeddedOutcome::Incomplete {
                has_title: true,
                has_author: false
            }
        ));
        assert!(matches!(
            classify_embedded(&meta(None, Some("  "))),
            EmbeddedOutcome::Absent
        ));
        assert!(matches!(
            classify_embedded(&EmbeddedMetadata::default()),
            EmbeddedOutcome::Absent
        ));
    }

    #[test]
    fn test_front_matter_stops_at_abstract() {
        let pages = vec![
            "  A Great Paper  \nJohn Smith\nUniversity X\nABSTRACT\nWe study...".to_string(),
            "never reached".to_string(),
        ];
        assert_eq!(
            collect_front_matter(&pages),
            "A Great Paper\nJohn Smith\nUniversity X"
        );
    }

    #[test]
    fn test_front_matter_abstract_must_be_whole_word() {
        let pages = vec!["Abstraction Layers\nAuthor\nAbstract: text".to_string()];
        assert_eq!(collect_front_matter(&pages), "Abstraction Layers\nAuthor");
    }

    #[test]
    fn test_front_matter_spans_pages_without_abstract() {
        let pages = vec!["Page one".to_string(), "Page two".to_string()];
        assert_eq!(collect_front_matter(&pages), "Page one\nPage two");
    }

    #[test]
    fn test_record_from_inferred_defaults() {
        let r = record_from_inferred(InferredMetadata::default());
        assert_eq!(r, BibliographicRecord::new("Unknown", "Untitled", "n.d."));
    }

    #[test]
    fn test_record_from_inferred_empty_authors() {
        let r = record_from_inferred(InferredMetadata {
            title: Some("T".into()),
            authors: Some(vec![]),
            year: Some("2001".into()),
        });
        assert_eq!(r.surname, "Unknown");
        assert_eq!(r.year, "2001");
    }

    #[test]
    fn test_record_from_inferred_coerces_year() {
        let with_year = |y: &str| {
            record_from_inferred(InferredMetadata {
                year: Some(y.into()),
                ..Default::default()
            })
            .year
        };
        assert_eq!(with_year("March 2019"), "2019");
        assert_eq!(with_year("N.D."), "n.d.");
        assert_eq!(with_year("unknown"), "n.d.");
        assert_eq!(with_year("1875"), "1875");
    }
}

//! External inference service used when a PDF carries no usable metadata.

pub mod mock;
pub mod openai;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("inference request timed out")]
    Timeout,
    #[error("inference service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("inference service returned no content")]
    EmptyResponse,
    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

/// Fields returned by the inference service. `None` means the key was
/// absent (or blank); defaults are applied by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredMetadata {
    pub title: Option<String>,
    /// Surnames in author order.
    pub authors: Option<Vec<String>>,
    pub year: Option<String>,
}

/// A service that infers bibliographic metadata from front-matter text.
pub trait MetadataService: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// One request for the given front-matter text.
    fn infer<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<InferredMetadata, InferenceError>> + Send + 'a>>;
}

/// Fixed instruction sent ahead of the document text.
pub const INSTRUCTION: &str = "You extract bibliographic information from research papers. \
You are given the opening text of a paper, up to its abstract. \
Reply with a strict JSON object and nothing else, using exactly these keys:\n\
- \"title\": the full paper title\n\
- \"authors\": an array of the authors' surnames, in order\n\
- \"year\": the four-digit publication year, or \"n.d.\" if it cannot be found";

/// The complete user message for `text`.
pub fn build_prompt(text: &str) -> String {
    format!("{INSTRUCTION}\n\nOpening text of the paper:\n---\n{text}\n---\n")
}

/// Parse the JSON object the model returned.
///
/// Anything that is not a JSON object is malformed. Individual keys are
/// lenient: a missing or blank key becomes `None`, `year` may be a string or
/// a number, and non-string author elements are ignored.
pub fn parse_metadata_json(content: &str) -> Result<InferredMetadata, InferenceError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| InferenceError::MalformedResponse("expected a JSON object".into()))?;

    let title = obj
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let authors = obj.get("authors").and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|a| a.as_str())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    let year = obj
        .get("year")
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty());

    Ok(InferredMetadata {
        title,
        authors,
        year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete() {
        let meta = parse_metadata_json(
            r#"{"title": "Deep Learning", "authors": ["LeCun", "Bengio", "Hinton"], "year": "2015"}"#,
        )
        .unwrap();
        assert_eq!(meta.title.as_deref(), Some("Deep Learning"));
        assert_eq!(
            meta.authors,
            Some(vec!["LeCun".into(), "Bengio".into(), "Hinton".into()])
        );
        assert_eq!(meta.year.as_deref(), Some("2015"));
    }

    #[test]
    fn test_parse_missing_keys() {
        let meta = parse_metadata_json(r#"{"title": "Only A Title"}"#).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Only A Title"));
        assert!(meta.authors.is_none());
        assert!(meta.year.is_none());
    }

    #[test]
    fn test_parse_numeric_year() {
        let meta = parse_metadata_json(r#"{"year": 2021}"#).unwrap();
        assert_eq!(meta.year.as_deref(), Some("2021"));
    }

    #[test]
    fn test_parse_blank_values_are_absent() {
        let meta = parse_metadata_json(r#"{"title": "  ", "authors": ["", " "], "year": ""}"#)
            .unwrap();
        assert!(meta.title.is_none());
        assert_eq!(meta.authors, Some(vec![]));
        assert!(meta.year.is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_metadata_json(r#"["not", "an", "object"]"#),
            Err(InferenceError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_metadata_json("Sure! Here is the JSON"),
            Err(InferenceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_prompt_contains_text_and_keys() {
        let prompt = build_prompt("A Study of Things\nJ. Smith");
        assert!(prompt.contains("A Study of Things\nJ. Smith"));
        assert!(prompt.contains("\"authors\""));
        assert!(prompt.contains("n.d."));
    }
}

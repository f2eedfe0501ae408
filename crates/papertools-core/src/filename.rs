//! Parsing of `[tag] - Surname - Title (Year)` file stems.
//!
//! Parsing runs an ordered list of independent pattern tiers. Each tier
//! either produces a complete set of fields or nothing; the first tier that
//! produces fields wins and later tiers are not consulted.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::text::{collapse_whitespace, find_year};
use crate::{BibliographicRecord, NO_DATE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Fields captured by a tier, before emptiness validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StemFields {
    surname: String,
    title: String,
    year: String,
}

type Tier = fn(&str) -> Option<StemFields>;

/// Tiers in priority order.
static TIERS: &[(&str, Tier)] = &[("strict", try_strict), ("loose", try_loose)];

/// Parse a file stem (no extension) into a [`BibliographicRecord`].
///
/// Whitespace is collapsed first. The leading bracket tag is required but
/// its content is discarded.
pub fn parse_stem(stem: &str) -> Result<BibliographicRecord, ParseFailure> {
    let normalized = collapse_whitespace(stem);

    let (tier, fields) = TIERS
        .iter()
        .find_map(|(name, tier)| tier(&normalized).map(|f| (*name, f)))
        .ok_or_else(|| ParseFailure::new("unrecognized filename format"))?;

    tracing::trace!(stem = %normalized, tier, "filename tier matched");

    if fields.surname.is_empty() {
        return Err(ParseFailure::new("empty surname"));
    }
    if fields.title.is_empty() {
        return Err(ParseFailure::new("empty title"));
    }

    Ok(BibliographicRecord {
        surname: fields.surname,
        title: fields.title,
        year: fields.year,
    })
}

/// `[..] - Surname - Title (2020)` or `... (n.d.)`.
fn try_strict(s: &str) -> Option<StemFields> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^\[.*?\]\s*-\s*(?P<surname>[^-]+?)\s*-\s*(?P<title>.+?)\s*\((?P<year>\d{4}|n\.d\.)\)$",
        )
        .unwrap()
    });

    let caps = RE.captures(s)?;
    Some(StemFields {
        surname: caps["surname"].trim().to_string(),
        title: caps["title"].trim().to_string(),
        year: caps["year"].trim().to_string(),
    })
}

/// `[..] - Surname - Title` with the year, if any, recovered from the title.
fn try_loose(s: &str) -> Option<StemFields> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^\[.*?\]\s*-\s*(?P<surname>[^-]+?)\s*-\s*(?P<title>.+?)$").unwrap()
    });

    let caps = RE.captures(s)?;
    let surname = caps["surname"].trim().to_string();
    let (title, year) = split_title_year(caps["title"].trim());
    Some(StemFields {
        surname,
        title,
        year,
    })
}

/// Recover a year from a loose title.
///
/// A trailing `(19xx)`/`(20xx)` is removed from the title; otherwise the first
/// bare 19xx/20xx anywhere in the title is used and the title is left as is.
fn split_title_year(title: &str) -> (String, String) {
    static TRAILING_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\s*\((?P<year>(?:19|20)\d{2})\)\s*$").unwrap());

    if let Some(caps) = TRAILING_RE.captures(title) {
        let whole = caps.get(0).unwrap();
        let stripped = title[..whole.start()].trim().to_string();
        return (stripped, caps["year"].to_string());
    }

    let year = find_year(title).unwrap_or(NO_DATE).to_string();
    (title.to_string(), year)
}

use std::fmt;

use thiserror::Error;

pub mod backend;
pub mod batch;
pub mod bibkey;
pub mod config_file;
pub mod filename;
pub mod inference;
pub mod resolver;
pub mod sanitize;
pub mod text;

// Re-export for convenience
pub use backend::{BackendError, DocumentBackend, EmbeddedMetadata};
pub use batch::{
    BatchEvent, BatchReport, FileFailure, FileOutcome, FileStatus, KeyCollision, generate_bib_all,
    rename_all,
};
pub use bibkey::{BibEntry, build_key};
pub use filename::{ParseFailure, parse_stem};
pub use inference::openai::OpenAiClient;
pub use inference::{InferenceError, InferredMetadata, MetadataService};
pub use resolver::{EmbeddedOutcome, MetadataResolver, MetadataSource, Resolution, ResolveError};
pub use sanitize::{DEFAULT_MAX_LEN, sanitize_component};

/// Year sentinel used when no publication year could be determined.
pub const NO_DATE: &str = "n.d.";

/// Bibliographic metadata for one paper: who, what, when.
///
/// Built per processed file and consumed immediately to produce a new file
/// name or a `.bib` entry; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibliographicRecord {
    pub surname: String,
    pub title: String,
    /// Four digits or [`NO_DATE`].
    pub year: String,
}

impl BibliographicRecord {
    pub fn new(
        surname: impl Into<String>,
        title: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        Self {
            surname: surname.into(),
            title: title.into(),
            year: year.into(),
        }
    }

    /// File name this record renames a PDF to: `[] - Surname - Title (Year).pdf`.
    ///
    /// The bracket tag is left empty for manual numbering afterwards.
    pub fn file_name(&self) -> String {
        format!("[] - {} - {} ({}).pdf", self.surname, self.title, self.year)
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("no API key available; run `papertools setkey` or set OPENAI_API_KEY")]
    CredentialMissing,
    #[error("failed to read folder {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration, resolved once per invocation and passed explicitly
/// into the resolver, the inference client and the batch drivers.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
    /// Pages scanned for front matter before giving up on finding "Abstract".
    pub max_pages: usize,
    /// Characters of front-matter text sent to the inference service.
    pub max_prompt_chars: usize,
    /// Length cap applied to each sanitized file-name component.
    pub max_component_len: usize,
    pub dry_run: bool,
}

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 60,
            max_pages: 3,
            max_prompt_chars: 3000,
            max_component_len: DEFAULT_MAX_LEN,
            dry_run: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("max_component_len", &self.max_component_len)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Config {
    /// The API key, or [`BatchError::CredentialMissing`] if none is set or it is blank.
    pub fn require_api_key(&self) -> Result<&str, BatchError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(BatchError::CredentialMissing)
    }

    /// Fill in values from an on-disk config file. Values already set from
    /// CLI flags or the environment should be applied afterwards so they win.
    pub fn with_file(mut self, file: &config_file::ConfigFile) -> Self {
        if let Some(api) = &file.api {
            if let Some(key) = &api.openai_api_key {
                self.api_key = Some(key.clone());
            }
            if let Some(url) = &api.base_url {
                self.api_base_url = url.clone();
            }
            if let Some(model) = &api.model {
                self.model = model.clone();
            }
            if let Some(secs) = api.timeout_secs {
                self.request_timeout_secs = secs;
            }
        }
        if let Some(extraction) = &file.extraction {
            if let Some(pages) = extraction.max_pages {
                self.max_pages = pages;
            }
            if let Some(chars) = extraction.max_prompt_chars {
                self.max_prompt_chars = chars;
            }
        }
        if let Some(naming) = &file.naming
            && let Some(len) = naming.max_component_len
        {
            self.max_component_len = len;
        }
        self
    }
}

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Title and author as stored in the document's own Info dictionary.
/// Blank values are normalised to `None` by implementors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Trait for PDF access backends.
///
/// Implementors provide the low-level PDF reading; deciding which source of
/// metadata to trust lives in [`crate::resolver::MetadataResolver`].
pub trait DocumentBackend: Send + Sync {
    /// Read the embedded document metadata.
    fn embedded_metadata(&self, path: &Path) -> Result<EmbeddedMetadata, BackendError>;

    /// Extract the text of at most `max_pages` leading pages, one string per page.
    fn page_texts(&self, path: &Path, max_pages: usize) -> Result<Vec<String>, BackendError>;
}

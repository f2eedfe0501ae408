use std::path::Path;

use mupdf::{Document, MetadataName, TextPageFlags};

use papertools_core::text::expand_ligatures;
use papertools_core::{BackendError, DocumentBackend, EmbeddedMetadata};

/// [`DocumentBackend`] reading the info dictionary and page text with MuPDF.
///
/// Kept in its own crate so `papertools-core` builds without mupdf.
#[derive(Debug, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn open(path: &Path) -> Result<Document, BackendError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;
    Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl DocumentBackend for MupdfBackend {
    fn embedded_metadata(&self, path: &Path) -> Result<EmbeddedMetadata, BackendError> {
        let document = open(path)?;

        let title = document
            .metadata(MetadataName::Title)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;
        let author = document
            .metadata(MetadataName::Author)
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

        Ok(EmbeddedMetadata {
            title: non_blank(title),
            author: non_blank(author),
        })
    }

    fn page_texts(&self, path: &Path, max_pages: usize) -> Result<Vec<String>, BackendError> {
        let document = open(path)?;

        let mut pages_text = Vec::new();

        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
            .take(max_pages)
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            // One output line per layout line, so front-matter lines stay intact.
            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }
            pages_text.push(expand_ligatures(&page_text));
        }

        tracing::trace!(file = %path.display(), pages = pages_text.len(), "extracted page text");
        Ok(pages_text)
    }
}

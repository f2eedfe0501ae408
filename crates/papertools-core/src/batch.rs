//! Folder-level drivers: rename every unprocessed PDF, or write a `.bib`
//! next to every renamed one.
//!
//! Files are processed one at a time in file-name order. A failure on one
//! file is recorded in the [`BatchReport`] and the batch moves on; only
//! batch-level preconditions ([`BatchError`]) abort a run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::backend::DocumentBackend;
use crate::bibkey::BibEntry;
use crate::filename::parse_stem;
use crate::inference::MetadataService;
use crate::resolver::{MetadataResolver, MetadataSource, ResolveError};
use crate::sanitize::sanitize_component;
use crate::{BatchError, BibliographicRecord, Config};

/// Why a single file could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum FileFailure {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("target already exists: {path}")]
    TargetExists { path: String },
}

#[derive(Debug)]
pub enum FileStatus {
    Renamed {
        new_name: String,
        source: MetadataSource,
    },
    BibWritten {
        bib_name: String,
        key: String,
    },
    Skipped {
        reason: String,
    },
    Failed(FileFailure),
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub status: FileStatus,
}

/// Two files in one bib run that produced the same citation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub first: String,
    pub second: String,
}

/// Progress events emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        total: usize,
    },
    Processing {
        index: usize,
        total: usize,
        file_name: &'a str,
    },
    Outcome {
        index: usize,
        total: usize,
        outcome: &'a FileOutcome,
    },
    Collision(&'a KeyCollision),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub dry_run: bool,
    pub outcomes: Vec<FileOutcome>,
    pub collisions: Vec<KeyCollision>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.status,
                    FileStatus::Renamed { .. } | FileStatus::BibWritten { .. }
                )
            })
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Failed(_)))
            .count()
    }

    fn push(
        &mut self,
        index: usize,
        total: usize,
        outcome: FileOutcome,
        progress: &impl Fn(BatchEvent<'_>),
    ) {
        progress(BatchEvent::Outcome {
            index,
            total,
            outcome: &outcome,
        });
        self.outcomes.push(outcome);
    }
}

/// Regular files in `folder` (non-recursive) with a `.pdf` extension in any
/// case, sorted by file name.
pub fn list_pdfs(folder: &Path) -> Result<Vec<(String, PathBuf)>, BatchError> {
    let entries = std::fs::read_dir(folder).map_err(|source| BatchError::ReadDir {
        path: folder.display().to_string(),
        source,
    })?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !is_pdf(&path) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => pdfs.push((name, path)),
            Err(raw) => {
                tracing::warn!(name = ?raw, "skipping file with non-UTF-8 name");
            }
        }
    }
    pdfs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pdfs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Files already following the naming convention start with a bracket tag.
fn is_renamed(file_name: &str) -> bool {
    file_name.starts_with('[')
}

/// Rename every PDF in `folder` that does not yet start with `[` to
/// `[] - Surname - Title (Year).pdf`, using resolved metadata.
///
/// Fails up front with [`BatchError::CredentialMissing`] before any file
/// is looked at if `config` carries no API key.
pub async fn rename_all(
    folder: &Path,
    config: &Config,
    backend: &dyn DocumentBackend,
    service: &dyn MetadataService,
    progress: impl Fn(BatchEvent<'_>),
) -> Result<BatchReport, BatchError> {
    config.require_api_key()?;

    let candidates: Vec<_> = list_pdfs(folder)?
        .into_iter()
        .filter(|(name, _)| !is_renamed(name))
        .collect();
    let total = candidates.len();
    let resolver = MetadataResolver::new(backend, service, config);
    let mut report = BatchReport {
        dry_run: config.dry_run,
        ..Default::default()
    };
    // Targets claimed earlier in this run (matters for dry runs, where
    // nothing is on disk yet).
    let mut claimed: HashSet<String> = HashSet::new();

    progress(BatchEvent::Started { total });

    for (index, (file_name, path)) in candidates.into_iter().enumerate() {
        progress(BatchEvent::Processing {
            index,
            total,
            file_name: &file_name,
        });

        let status = rename_one(&resolver, folder, &path, config, &mut claimed).await;
        if let FileStatus::Failed(ref e) = status {
            tracing::warn!(file = %file_name, error = %e, "rename failed");
        }
        report.push(index, total, FileOutcome { file_name, status }, &progress);
    }

    Ok(report)
}

async fn rename_one(
    resolver: &MetadataResolver<'_>,
    folder: &Path,
    path: &Path,
    config: &Config,
    claimed: &mut HashSet<String>,
) -> FileStatus {
    let resolution = match resolver.resolve(path).await {
        Ok(r) => r,
        Err(e) => return FileStatus::Failed(e.into()),
    };

    let max_len = config.max_component_len;
    let record = &resolution.record;
    let clean = BibliographicRecord::new(
        sanitize_component(&record.surname, max_len),
        sanitize_component(&record.title, max_len),
        sanitize_component(&record.year, max_len),
    );
    let new_name = clean.file_name();
    let target = folder.join(&new_name);

    if claimed.contains(&new_name) || target.exists() {
        return FileStatus::Failed(FileFailure::TargetExists {
            path: target.display().to_string(),
        });
    }

    if !config.dry_run
        && let Err(source) = std::fs::rename(path, &target)
    {
        return FileStatus::Failed(FileFailure::Filesystem {
            path: path.display().to_string(),
            source,
        });
    }

    claimed.insert(new_name.clone());
    FileStatus::Renamed {
        new_name,
        source: resolution.source,
    }
}

/// Write a `.bib` file next to every PDF in `folder` whose name starts with
/// `[`, built from the file name alone. Existing `.bib` files are overwritten.
///
/// Stems that do not parse are skipped. Keys repeated within the run are
/// reported as [`KeyCollision`]s; both files are still written.
pub fn generate_bib_all(
    folder: &Path,
    config: &Config,
    progress: impl Fn(BatchEvent<'_>),
) -> Result<BatchReport, BatchError> {
    let candidates: Vec<_> = list_pdfs(folder)?
        .into_iter()
        .filter(|(name, _)| is_renamed(name))
        .collect();
    let total = candidates.len();
    let mut report = BatchReport {
        dry_run: config.dry_run,
        ..Default::default()
    };
    let mut seen_keys: HashMap<String, String> = HashMap::new();

    progress(BatchEvent::Started { total });

    for (index, (file_name, path)) in candidates.into_iter().enumerate() {
        progress(BatchEvent::Processing {
            index,
            total,
            file_name: &file_name,
        });

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let record = match parse_stem(&stem) {
            Ok(r) => r,
            Err(e) => {
                tracing::info!(file = %file_name, reason = %e, "skipping unparsable file name");
                let status = FileStatus::Skipped {
                    reason: format!("unable to parse metadata from filename ({e})"),
                };
                report.push(index, total, FileOutcome { file_name, status }, &progress);
                continue;
            }
        };

        let entry = BibEntry::new(record);

        if let Some(first) = seen_keys.get(&entry.key) {
            let collision = KeyCollision {
                key: entry.key.clone(),
                first: first.clone(),
                second: file_name.clone(),
            };
            tracing::warn!(
                key = %collision.key,
                first = %collision.first,
                second = %collision.second,
                "duplicate bib key"
            );
            progress(BatchEvent::Collision(&collision));
            report.collisions.push(collision);
        } else {
            seen_keys.insert(entry.key.clone(), file_name.clone());
        }

        let bib_path = path.with_extension("bib");
        let bib_name = bib_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let status = if config.dry_run {
            FileStatus::BibWritten {
                bib_name,
                key: entry.key,
            }
        } else {
            match std::fs::write(&bib_path, entry.to_string()) {
                Ok(()) => FileStatus::BibWritten {
                    bib_name,
                    key: entry.key,
                },
                Err(source) => {
                    let failure = FileFailure::Filesystem {
                        path: bib_path.display().to_string(),
                        source,
                    };
                    tracing::warn!(file = %file_name, error = %failure, "bib write failed");
                    FileStatus::Failed(failure)
                }
            }
        };
        report.push(index, total, FileOutcome { file_name, status }, &progress);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_case_insensitive() {
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(is_pdf(Path::new("a.PDF")));
        assert!(is_pdf(Path::new("a.b.Pdf")));
        assert!(!is_pdf(Path::new("a.pdf.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_is_renamed() {
        assert!(is_renamed("[] - A - B (2020).pdf"));
        assert!(!is_renamed(" [1] - A - B.pdf"));
        assert!(!is_renamed("paper.pdf"));
    }

    #[test]
    fn test_list_pdfs_missing_folder() {
        let err = list_pdfs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, BatchError::ReadDir { .. }));
    }
}

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::Serialize;
use tempfile::TempDir;

use crate::decompress::Decompressor;
use crate::error::IngestError;
use crate::extract;
use crate::inspect::{self, ArchiveFormat};

/// One file inside the archive, as discovered by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Normalized (forward-slash, no leading slash) path inside the archive.
    pub relative_path: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
enum PlanSource {
    Zip {
        archive: Arc<Mutex<zip::ZipArchive<File>>>,
        index_by_path: Arc<HashMap<String, usize>>,
    },
    Scratch {
        dir: TempDir,
    },
}

/// Everything needed to execute one ingestion attempt.
///
/// The plan exclusively owns its backing state: the open archive handle for
/// zip input, or the scratch directory for formats that were decompressed.
/// [`UploadPlan::cleanup`] releases that state; calling it again is a no-op,
/// and `Drop` acts as a backstop for paths that never reach an explicit
/// cleanup.
#[derive(Debug)]
pub struct UploadPlan {
    archive_path: PathBuf,
    format: ArchiveFormat,
    entries: Vec<ArchiveEntry>,
    source: Option<PlanSource>,
}

impl UploadPlan {
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// The scratch directory, present iff the format required full
    /// decompression and the plan has not been cleaned up yet.
    pub fn scratch_dir(&self) -> Option<&Path> {
        match &self.source {
            Some(PlanSource::Scratch { dir }) => Some(dir.path()),
            _ => None,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size_bytes).sum()
    }

    /// Release the plan's backing state. Idempotent: the second and later
    /// calls do nothing.
    pub fn cleanup(&mut self) {
        match self.source.take() {
            Some(PlanSource::Scratch { dir }) => {
                let path = dir.path().to_path_buf();
                if let Err(err) = dir.close() {
                    log::warn!(
                        "Failed to remove scratch directory {}: {err}",
                        path.display()
                    );
                }
            }
            Some(PlanSource::Zip { .. }) | None => {}
        }
    }

    pub(crate) fn content_reader(&self) -> Option<ContentReader> {
        match &self.source {
            Some(PlanSource::Zip {
                archive,
                index_by_path,
            }) => Some(ContentReader::Zip {
                archive: archive.clone(),
                index_by_path: index_by_path.clone(),
            }),
            Some(PlanSource::Scratch { dir }) => Some(ContentReader::Scratch {
                root: dir.path().to_path_buf(),
            }),
            None => None,
        }
    }
}

impl Drop for UploadPlan {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Classify the archive and enumerate its contents into an [`UploadPlan`].
///
/// Zip archives are enumerated lazily from the central directory; every
/// other supported format is handed to the decompression capability, then
/// the scratch directory is walked. If extraction fails partway the scratch
/// directory is released before the error propagates.
pub async fn prepare_plan(
    decompressor: Arc<dyn Decompressor>,
    archive_path: &Path,
    password: Option<&str>,
) -> Result<UploadPlan, IngestError> {
    let classification = inspect::classify(archive_path);
    let Some(format) = classification.format else {
        return Err(IngestError::UnsupportedFormat {
            path: archive_path.to_path_buf(),
        });
    };

    if format.requires_decompression() {
        prepare_extracted_plan(decompressor, archive_path, format, password).await
    } else {
        prepare_zip_plan(archive_path).await
    }
}

async fn prepare_zip_plan(archive_path: &Path) -> Result<UploadPlan, IngestError> {
    let path = archive_path.to_path_buf();
    let enumeration = tokio::task::spawn_blocking(move || extract::enumerate_zip(&path))
        .await
        .map_err(|err| IngestError::ExtractionFailed {
            reason: format!("archive enumeration task failed: {err}"),
        })??;

    log::info!(
        "Planned {} entr(ies) from {}",
        enumeration.entries.len(),
        archive_path.display()
    );

    Ok(UploadPlan {
        archive_path: archive_path.to_path_buf(),
        format: ArchiveFormat::Zip,
        entries: enumeration.entries,
        source: Some(PlanSource::Zip {
            archive: Arc::new(Mutex::new(enumeration.archive)),
            index_by_path: Arc::new(enumeration.index_by_path),
        }),
    })
}

async fn prepare_extracted_plan(
    decompressor: Arc<dyn Decompressor>,
    archive_path: &Path,
    format: ArchiveFormat,
    password: Option<&str>,
) -> Result<UploadPlan, IngestError> {
    // The TempDir is created here and only handed to the plan on success;
    // every early return below drops it, removing the scratch directory.
    let scratch = tempfile::tempdir().map_err(IngestError::from_io)?;

    let path = archive_path.to_path_buf();
    let target = scratch.path().to_path_buf();
    let password = password.map(str::to_owned);
    let entries = tokio::task::spawn_blocking(move || {
        let extracted_to = decompressor
            .decompress(&path, &target, password.as_deref())
            .map_err(IngestError::from)?;
        extract::enumerate_dir(&extracted_to)
    })
    .await
    .map_err(|err| IngestError::ExtractionFailed {
        reason: format!("decompression task failed: {err}"),
    })??;

    log::info!(
        "Extracted {} file(s) from {} into scratch dir",
        entries.len(),
        archive_path.display()
    );

    Ok(UploadPlan {
        archive_path: archive_path.to_path_buf(),
        format,
        entries,
        source: Some(PlanSource::Scratch { dir: scratch }),
    })
}

/// Per-item content access for the executor.
///
/// Zip reads go back to the already-open archive handle; extracted formats
/// read from the scratch directory.
pub(crate) enum ContentReader {
    Zip {
        archive: Arc<Mutex<zip::ZipArchive<File>>>,
        index_by_path: Arc<HashMap<String, usize>>,
    },
    Scratch {
        root: PathBuf,
    },
}

impl ContentReader {
    pub(crate) async fn read(&self, source_relative_path: &str) -> anyhow::Result<Vec<u8>> {
        match self {
            ContentReader::Zip {
                archive,
                index_by_path,
            } => {
                let index = *index_by_path
                    .get(source_relative_path)
                    .with_context(|| format!("entry '{source_relative_path}' not in archive"))?;
                let archive = archive.clone();
                let path = source_relative_path.to_string();
                tokio::task::spawn_blocking(move || read_zip_entry(&archive, index, &path))
                    .await
                    .context("zip read task failed")?
            }
            ContentReader::Scratch { root } => {
                let full_path = root.join(source_relative_path);
                tokio::fs::read(&full_path)
                    .await
                    .with_context(|| format!("cannot read {}", full_path.display()))
            }
        }
    }
}

fn read_zip_entry(
    archive: &Mutex<zip::ZipArchive<File>>,
    index: usize,
    path: &str,
) -> anyhow::Result<Vec<u8>> {
    let mut guard = archive.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut entry = guard
        .by_index(index)
        .with_context(|| format!("cannot open archive entry '{path}'"))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("cannot read archive entry '{path}'"))?;
    Ok(bytes)
}

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::error::IngestError;
use crate::plan::ArchiveEntry;

/// Folder name macOS embeds in zip archives for resource forks.
const RESERVED_METADATA_DIR: &str = "__MACOSX";

/// The single path-safety filter every candidate entry path passes through,
/// whichever extraction path produced it.
///
/// Backslashes are normalized to forward slashes and a leading slash is
/// stripped before the checks. Returns `None` for paths that must not be
/// uploaded: empty paths, paths starting with `.`, paths with a `..`
/// segment, and paths containing the reserved metadata folder.
pub(crate) fn sanitize_entry_path(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');

    if trimmed.is_empty() || trimmed.starts_with('.') {
        return None;
    }
    for segment in trimmed.split('/') {
        if segment == ".." || segment == RESERVED_METADATA_DIR {
            return None;
        }
    }

    Some(trimmed.to_string())
}

#[derive(Debug)]
pub(crate) struct ZipEnumeration {
    pub archive: zip::ZipArchive<File>,
    pub entries: Vec<ArchiveEntry>,
    /// Sanitized path → central-directory index, for per-item reads later.
    pub index_by_path: HashMap<String, usize>,
}

/// Enumerate a zip archive's central directory without reading content.
///
/// Directory entries and entries rejected by the safety filter are skipped.
pub(crate) fn enumerate_zip(archive_path: &Path) -> Result<ZipEnumeration, IngestError> {
    let file = File::open(archive_path).map_err(IngestError::from_io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| IngestError::CorruptArchive {
        reason: err.to_string(),
    })?;

    let mut entries = Vec::new();
    let mut index_by_path = HashMap::new();

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|err| IngestError::CorruptArchive {
                reason: err.to_string(),
            })?;
        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let Some(relative_path) = sanitize_entry_path(&raw_name) else {
            log::debug!("Skipping unsafe archive entry {raw_name:?}");
            continue;
        };
        if index_by_path.contains_key(&relative_path) {
            log::debug!("Skipping duplicate archive entry {relative_path:?}");
            continue;
        }

        index_by_path.insert(relative_path.clone(), index);
        entries.push(ArchiveEntry {
            relative_path,
            size_bytes: entry.size(),
        });
    }

    Ok(ZipEnumeration {
        archive,
        entries,
        index_by_path,
    })
}

/// Build entries from the files under a scratch directory after full
/// decompression. Walk order is sorted so the resulting upload order is
/// deterministic.
pub(crate) fn enumerate_dir(root: &Path) -> Result<Vec<ArchiveEntry>, IngestError> {
    let mut entries = Vec::new();

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| IngestError::ExtractionFailed {
            reason: format!("cannot walk extracted files: {err}"),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let raw = relative.to_string_lossy();
        let Some(relative_path) = sanitize_entry_path(&raw) else {
            log::debug!("Skipping unsafe extracted file {raw:?}");
            continue;
        };

        let size_bytes = entry
            .metadata()
            .map_err(|err| IngestError::ExtractionFailed {
                reason: format!("cannot stat {raw}: {err}"),
            })?
            .len();

        entries.push(ArchiveEntry {
            relative_path,
            size_bytes,
        });
    }

    Ok(entries)
}

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;

use crate::error::IngestError;
use crate::plan::ArchiveEntry;

/// How to handle a planned entry whose base name already exists at the
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Drop the entry from the upload set.
    Skip,
    /// Keep the destination name and overwrite the existing object.
    Replace,
    /// Upload under a fresh ` (2)`, ` (3)`, … suffixed name.
    Rename,
}

impl DuplicateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateStrategy::Skip => "skip",
            DuplicateStrategy::Replace => "replace",
            DuplicateStrategy::Rename => "rename",
        }
    }
}

impl FromStr for DuplicateStrategy {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(DuplicateStrategy::Skip),
            "replace" => Ok(DuplicateStrategy::Replace),
            "rename" => Ok(DuplicateStrategy::Rename),
            _ => Err(IngestError::InvalidStrategy(value.to_string())),
        }
    }
}

/// One resolved upload, derived from an [`ArchiveEntry`] plus the duplicate
/// decision. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadItem {
    pub source_relative_path: String,
    /// Differs from the source path only under the rename strategy.
    pub dest_relative_path: String,
    pub upsert: bool,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct Resolution {
    pub items: Vec<UploadItem>,
    pub skipped_duplicates: u64,
}

/// Base name of a normalized relative path (the final `/`-separated
/// segment). Collision detection works on base names only, matching a flat
/// destination-folder convention.
pub fn base_name(relative_path: &str) -> &str {
    relative_path
        .rsplit('/')
        .next()
        .unwrap_or(relative_path)
}

/// The planned base names that already exist at the destination.
pub fn detect_duplicates(
    entries: &[ArchiveEntry],
    existing_names: &HashSet<String>,
) -> HashSet<String> {
    entries
        .iter()
        .map(|entry| base_name(&entry.relative_path))
        .filter(|name| existing_names.contains(*name))
        .map(str::to_owned)
        .collect()
}

/// Apply the duplicate strategy to every planned entry.
///
/// `duplicates` is the detected collision set for this plan; `existing_names`
/// is consulted again when probing rename candidates. Names allocated
/// earlier in the same pass are also avoided, so a batch with several
/// entries sharing one colliding base name fans out to ` (2)`, ` (3)`, …
pub fn resolve_entries(
    entries: &[ArchiveEntry],
    existing_names: &HashSet<String>,
    duplicates: &HashSet<String>,
    strategy: DuplicateStrategy,
) -> Resolution {
    let mut items = Vec::with_capacity(entries.len());
    let mut skipped_duplicates = 0u64;
    let mut allocated: HashSet<String> = HashSet::new();

    for entry in entries {
        let name = base_name(&entry.relative_path);

        if !duplicates.contains(name) {
            allocated.insert(name.to_string());
            items.push(UploadItem {
                source_relative_path: entry.relative_path.clone(),
                dest_relative_path: entry.relative_path.clone(),
                upsert: false,
                size_bytes: entry.size_bytes,
            });
            continue;
        }

        match strategy {
            DuplicateStrategy::Skip => {
                skipped_duplicates += 1;
            }
            DuplicateStrategy::Replace => {
                allocated.insert(name.to_string());
                items.push(UploadItem {
                    source_relative_path: entry.relative_path.clone(),
                    dest_relative_path: entry.relative_path.clone(),
                    upsert: true,
                    size_bytes: entry.size_bytes,
                });
            }
            DuplicateStrategy::Rename => {
                let renamed = next_available_name(name, existing_names, &allocated);
                let dest = with_base_name(&entry.relative_path, &renamed);
                allocated.insert(renamed);
                items.push(UploadItem {
                    source_relative_path: entry.relative_path.clone(),
                    dest_relative_path: dest,
                    upsert: false,
                    size_bytes: entry.size_bytes,
                });
            }
        }
    }

    Resolution {
        items,
        skipped_duplicates,
    }
}

fn next_available_name(
    name: &str,
    existing_names: &HashSet<String>,
    allocated: &HashSet<String>,
) -> String {
    let (stem, extension) = split_name(name);
    let mut counter = 2u32;
    loop {
        let candidate = format!("{stem} ({counter}){extension}");
        if !existing_names.contains(&candidate) && !allocated.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Split `report.pdf` into `("report", ".pdf")`; extension-less names and
/// names whose only dot is leading keep the whole name as the stem.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], &name[index..]),
        _ => (name, ""),
    }
}

/// Swap the final path segment, preserving the parent folder.
fn with_base_name(relative_path: &str, new_name: &str) -> String {
    match relative_path.rfind('/') {
        Some(index) => format!("{}/{new_name}", &relative_path[..index]),
        None => new_name.to_string(),
    }
}

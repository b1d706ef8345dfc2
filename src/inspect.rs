use std::path::Path;

/// Container formats this pipeline accepts.
///
/// Classification is by extension plausibility only; whether the bytes
/// actually form a valid archive is discovered when extraction is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Random-access container; entries are read lazily, one at a time.
    Zip,
    /// Single-file 7z container; requires full decompression first.
    SevenZip,
    /// Split 7z container (`name.7z.001`, `name.7z.002`, …), opened via its
    /// first volume; requires full decompression first.
    SevenZipMultiVolume,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::SevenZip => "7z",
            ArchiveFormat::SevenZipMultiVolume => "7z-multi-volume",
        }
    }

    /// Whether the format must be fully decompressed into a scratch
    /// directory before its entries can be enumerated or read.
    pub fn requires_decompression(&self) -> bool {
        !matches!(self, ArchiveFormat::Zip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub supported: bool,
    pub format: Option<ArchiveFormat>,
}

const UNSUPPORTED: Classification = Classification {
    supported: false,
    format: None,
};

/// Classify a path by file-name extension.
pub fn classify(path: &Path) -> Classification {
    let name = match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return UNSUPPORTED,
    };

    // Multi-volume naming: the format marker followed by an all-digit
    // suffix, e.g. `backup.7z.001`. Checked before the plain extensions so
    // the numeric suffix is not mistaken for an unsupported extension.
    if let Some(marker) = name.rfind(".7z.") {
        let suffix = &name[marker + 4..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Classification {
                supported: true,
                format: Some(ArchiveFormat::SevenZipMultiVolume),
            };
        }
    }

    if name.ends_with(".zip") && name.len() > 4 {
        return Classification {
            supported: true,
            format: Some(ArchiveFormat::Zip),
        };
    }

    if name.ends_with(".7z") && name.len() > 3 {
        return Classification {
            supported: true,
            format: Some(ArchiveFormat::SevenZip),
        };
    }

    UNSUPPORTED
}

pub fn is_supported(path: &Path) -> bool {
    classify(path).supported
}

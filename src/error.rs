use std::path::PathBuf;

/// Errors raised while preparing or executing an ingestion.
///
/// Per-item upload failures are deliberately absent: they are recorded in
/// [`crate::UploadResult::failed`] and never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Archive is corrupted: {reason}")]
    CorruptArchive { reason: String },

    #[error("Decompression backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("Missing archive volume: {reason}")]
    MissingVolume { reason: String },

    #[error("Archive requires a password")]
    PasswordRequired,

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Unknown duplicate strategy '{0}' (expected 'skip', 'replace', or 'rename')")]
    InvalidStrategy(String),

    #[error("Extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            IngestError::PermissionDenied {
                reason: err.to_string(),
            }
        } else {
            IngestError::Io(err)
        }
    }
}

/// Failure reported by a [`crate::Decompressor`] capability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecompressError {
    #[error("archive data is corrupted: {0}")]
    Corrupted(String),

    #[error("missing archive volume: {0}")]
    MissingVolume(String),

    #[error("archive requires a password")]
    PasswordRequired,

    #[error("decompression backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl DecompressError {
    /// Best-effort classification of a backend's free-text output.
    ///
    /// This is a heuristic over known 7-Zip message fragments, not a
    /// contract; backends that return typed errors never go through it.
    pub fn classify(message: &str) -> Self {
        let normalized = message.to_lowercase();
        let summary = first_line(message);

        if normalized.contains("wrong password") || normalized.contains("password") {
            return DecompressError::PasswordRequired;
        }
        if normalized.contains("missing volume") {
            return DecompressError::MissingVolume(summary);
        }
        if normalized.contains("cannot open the file as")
            || normalized.contains("can not open the file as")
            || normalized.contains("is not archive")
            || normalized.contains("headers error")
            || normalized.contains("crc failed")
            || normalized.contains("data error")
            || normalized.contains("unexpected end of archive")
            || normalized.contains("corrupt")
        {
            return DecompressError::Corrupted(summary);
        }
        if normalized.contains("command not found") || normalized.contains("no such binary") {
            return DecompressError::BackendUnavailable(summary);
        }

        DecompressError::Other(summary)
    }
}

impl From<DecompressError> for IngestError {
    fn from(err: DecompressError) -> Self {
        match err {
            DecompressError::Corrupted(reason) => IngestError::CorruptArchive { reason },
            DecompressError::MissingVolume(reason) => IngestError::MissingVolume { reason },
            DecompressError::PasswordRequired => IngestError::PasswordRequired,
            DecompressError::BackendUnavailable(reason) => {
                IngestError::BackendUnavailable { reason }
            }
            DecompressError::Other(reason) => IngestError::ExtractionFailed { reason },
        }
    }
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_password_messages() {
        let err = DecompressError::classify("ERROR: Wrong password : secret.7z");
        assert!(matches!(err, DecompressError::PasswordRequired));

        let err = DecompressError::classify("Enter password (will not be echoed):");
        assert!(matches!(err, DecompressError::PasswordRequired));
    }

    #[test]
    fn classify_missing_volume() {
        let err = DecompressError::classify("ERROR: Missing volume : archive.7z.002");
        assert!(matches!(err, DecompressError::MissingVolume(_)));
    }

    #[test]
    fn classify_corruption_messages() {
        for message in [
            "ERROR: archive.7z : Can not open the file as [7z] archive",
            "ERROR: CRC Failed : data/file.bin",
            "ERROR: Data Error : payload.bin",
            "Unexpected end of archive",
            "Headers Error in archive",
        ] {
            let err = DecompressError::classify(message);
            assert!(
                matches!(err, DecompressError::Corrupted(_)),
                "expected Corrupted for {message:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn classify_unknown_falls_back_to_other() {
        let err = DecompressError::classify("something unexpected happened");
        assert!(matches!(err, DecompressError::Other(_)));
    }

    #[test]
    fn classify_keeps_first_meaningful_line() {
        let err = DecompressError::classify("\n\n  ERROR: Data Error : x\nmore context");
        match err {
            DecompressError::Corrupted(reason) => assert_eq!(reason, "ERROR: Data Error : x"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn decompress_errors_map_into_ingest_taxonomy() {
        let err: IngestError = DecompressError::PasswordRequired.into();
        assert!(matches!(err, IngestError::PasswordRequired));

        let err: IngestError = DecompressError::Corrupted("bad".into()).into();
        assert!(matches!(err, IngestError::CorruptArchive { .. }));

        let err: IngestError = DecompressError::BackendUnavailable("gone".into()).into();
        assert!(matches!(err, IngestError::BackendUnavailable { .. }));
    }

    #[test]
    fn permission_denied_io_errors_get_their_own_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            IngestError::from_io(io),
            IngestError::PermissionDenied { .. }
        ));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(IngestError::from_io(io), IngestError::Io(_)));
    }
}

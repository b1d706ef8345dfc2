use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::DecompressError;

/// Decompression capability for formats without random access.
///
/// Implementations block; the pipeline always drives them from a blocking
/// task. For multi-volume archives the first volume file is the one passed
/// in.
pub trait Decompressor: Send + Sync {
    fn decompress(
        &self,
        archive_path: &Path,
        target_dir: &Path,
        password: Option<&str>,
    ) -> Result<PathBuf, DecompressError>;
}

/// Adapter driving an external 7-Zip command-line binary (`7zz`/`7z`).
///
/// Failures are classified from the tool's free-text output via
/// [`DecompressError::classify`]; see that method for the caveat.
pub struct SevenZipCli {
    binary: PathBuf,
}

impl SevenZipCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Locate a 7-Zip binary on PATH.
    pub fn discover() -> Result<Self, DecompressError> {
        for candidate in ["7zz", "7z", "7za"] {
            if let Ok(output) = Command::new("which").arg(candidate).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        return Ok(Self::new(path));
                    }
                }
            }
        }

        Err(DecompressError::BackendUnavailable(
            "no 7-Zip binary (7zz, 7z, 7za) found on PATH".to_string(),
        ))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Decompressor for SevenZipCli {
    fn decompress(
        &self,
        archive_path: &Path,
        target_dir: &Path,
        password: Option<&str>,
    ) -> Result<PathBuf, DecompressError> {
        std::fs::create_dir_all(target_dir)
            .map_err(|err| DecompressError::Other(format!("cannot create target dir: {err}")))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("x")
            .arg("-y")
            .arg("-aoa")
            .arg("-bd")
            .arg("-scsUTF-8");

        // An explicit -p keeps the binary from blocking on an interactive
        // password prompt when the archive turns out to be encrypted.
        match password {
            Some(password) => cmd.arg(format!("-p{password}")),
            None => cmd.arg("-p"),
        };

        cmd.arg(format!("-o{}", target_dir.display()))
            .arg(archive_path);

        let output = cmd.output().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                DecompressError::BackendUnavailable(format!(
                    "{} not found",
                    self.binary.display()
                ))
            } else {
                DecompressError::Other(err.to_string())
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            log::warn!(
                "7-Zip extraction of {} failed: {}",
                archive_path.display(),
                stderr.trim()
            );
            return Err(DecompressError::classify(&format!("{stderr}\n{stdout}")));
        }

        Ok(target_dir.to_path_buf())
    }
}

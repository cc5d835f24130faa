//! # Upload Staging
//!
//! Each `/analyze` request owns exactly one transient copy of the uploaded
//! audio, staged to disk so the transcription pipeline can read it by path.
//!
//! ## Resource Lifetime:
//! `StagedAudio` wraps a named temp file whose deletion is tied to `Drop`.
//! Acquisition happens before the transcription call; release happens when the
//! guard leaves scope — on success, on transcription failure, and on any early
//! return alike. There are no manual cleanup calls to forget on an error path,
//! and cleanup can never mask the failure being reported.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// A request-scoped temp file holding one uploaded audio payload.
///
/// The backing file is removed when this guard is dropped.
pub struct StagedAudio {
    file: NamedTempFile,
}

impl StagedAudio {
    /// Write the uploaded bytes to a fresh temp file.
    ///
    /// The `.wav` suffix keeps the staged name meaningful in debug logs; the
    /// decoder inspects content, not extensions.
    pub fn stage(bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("speaksense-upload-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temp file for upload")?;

        file.write_all(bytes)
            .context("Failed to write upload to temp file")?;
        file.flush().context("Failed to flush staged upload")?;

        debug!(
            "Staged {} byte upload at {:?}",
            bytes.len(),
            file.path()
        );

        Ok(Self { file })
    }

    /// Path to the staged audio, valid for the lifetime of this guard.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stage_writes_bytes() {
        let staged = StagedAudio::stage(b"fake audio bytes").unwrap();
        let contents = std::fs::read(staged.path()).unwrap();
        assert_eq!(contents, b"fake audio bytes");
    }

    #[test]
    fn test_drop_releases_file() {
        let path: PathBuf;
        {
            let staged = StagedAudio::stage(&[0u8; 128]).unwrap();
            path = staged.path().to_path_buf();
            assert!(path.exists());
        }
        // Guard dropped: the temp file must be gone
        assert!(!path.exists());
    }

    // Mirrors the /analyze error path: the guard is dropped while an error
    // propagates, and the staged file must still be released.
    fn failing_pipeline(staged_path: &mut PathBuf) -> anyhow::Result<()> {
        let staged = StagedAudio::stage(b"corrupt")?;
        *staged_path = staged.path().to_path_buf();
        anyhow::bail!("simulated transcription failure")
    }

    #[test]
    fn test_release_happens_on_error_paths_too() {
        let mut path = PathBuf::new();
        let result = failing_pipeline(&mut path);

        assert!(result.is_err());
        assert!(!path.as_os_str().is_empty());
        assert!(!path.exists());
    }
}

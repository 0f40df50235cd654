//! Single-shot artifact writer with atomic finalize.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes to `<final>.part` and renames into place on [`finalize`](Self::finalize).
/// If dropped without finalizing, the temp file is removed so nothing partial is left behind.
pub struct ArtifactWriter {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl ArtifactWriter {
    /// Create (or truncate) the temp file next to `final_path`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp_path = super::temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(ArtifactWriter {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    /// One write call; returns the byte count the OS accepted (may be short).
    pub fn write_once(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(f) => f.write(data),
            None => Err(io::Error::other("writer already closed")),
        }
    }

    pub fn sync(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.sync_all(),
            None => Ok(()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Close the file and rename it to the final path.
    pub fn finalize(mut self) -> io::Result<PathBuf> {
        // Close before rename.
        drop(self.file.take());
        if let Err(e) = std::fs::rename(&self.temp_path, &self.final_path) {
            let _ = std::fs::remove_file(&self.temp_path);
            return Err(e);
        }
        Ok(self.final_path.clone())
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        if let Some(f) = self.file.take() {
            drop(f);
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::debug!("failed to remove {}: {}", self.temp_path.display(), e);
            }
        }
    }
}

// sdeupdater/src/fetch/artifact.rs
use log::debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, TempPath};

use crate::errors::Result;

/// A pipeline stage's output on disk. The file is removed when the handle
/// is dropped, on every path out of the stage, unless it is handed off.
#[derive(Debug)]
pub struct TempArtifact {
    path: TempPath,
}

impl TempArtifact {
    /// Creates an empty temp file with the given suffix and returns the
    /// writable handle alongside the owning artifact.
    pub(crate) fn create(suffix: &str) -> Result<(File, TempArtifact)> {
        Self::create_in(&std::env::temp_dir(), suffix)
    }

    pub(crate) fn create_in(dir: &Path, suffix: &str) -> Result<(File, TempArtifact)> {
        let (file, path) = TempFileBuilder::new()
            .prefix("sde_")
            .suffix(suffix)
            .tempfile_in(dir)?
            .into_parts();
        debug!("Created temporary artifact {}", path.display());
        Ok((file, TempArtifact { path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Moves the file to `destination` and gives up ownership of it. Falls
    /// back to a copy when the rename crosses filesystems.
    pub fn hand_off(self, destination: &Path) -> Result<PathBuf> {
        match self.path.persist(destination) {
            Ok(()) => Ok(destination.to_path_buf()),
            Err(e) => {
                debug!("Rename to {} failed ({}), copying instead", destination.display(), e.error);
                fs::copy(&e.path, destination)?;
                Ok(destination.to_path_buf())
            }
        }
    }
}

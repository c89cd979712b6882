//! Per-run staging directory.

use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// An ephemeral directory owning extracted or checked-out content until the
/// swap into the final destination succeeds.
///
/// The directory is created next to the final destination, not under the
/// system temp root: the materializer's rename must stay on one filesystem.
/// Dropping a `StagingArea` removes whatever is left of the tree; after a
/// successful rename-away nothing is left and the drop is a no-op.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
}

impl StagingArea {
    /// Create a unique staging directory under `parent`.
    pub fn create_in(parent: &Path) -> Result<Self, FetchError> {
        let pid = std::process::id();
        for attempt in 0..100 {
            let candidate = parent.join(format!(".ghdir-staging.{pid}.{attempt}"));
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(Self { path: candidate }),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(FetchError::ExtractionIo {
                        path: candidate,
                        source: err,
                    });
                }
            }
        }
        Err(FetchError::ExtractionIo {
            path: parent.to_path_buf(),
            source: std::io::Error::other("could not allocate a staging directory"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staging tree now, surfacing the leftover path on failure.
    pub fn remove(self) -> Result<(), (PathBuf, std::io::Error)> {
        let path = self.path.clone();
        // Drop still runs afterwards; a second removal of a gone tree is fine.
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err((path, err)),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

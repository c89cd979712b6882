//! Error taxonomy for the fetch engine.
//!
//! Every variant is terminal for the run; nothing here is retried. Cache
//! load/save problems are deliberately absent: the cache degrades to a
//! redundant download, never to a failed run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The source URL does not name at least an owner and a repository.
    #[error("invalid GitHub URL: {0}")]
    InvalidSourceUrl(String),

    /// The metadata or download request failed, or the host answered with a
    /// status that is neither success nor not-modified.
    #[error("repository is unreachable: {0}")]
    RemoteUnavailable(String),

    /// The response body could not be decompressed or read as a tar archive.
    #[error("archive could not be read: {0}")]
    ArchiveCorrupt(#[source] std::io::Error),

    /// A filesystem write failed while materializing an archive entry.
    #[error("failed to write {}: {source}", path.display())]
    ExtractionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A step of the external git sparse-checkout sequence failed.
    #[error("sparse checkout failed: {0}")]
    SparseCheckoutFailed(String),

    /// The staged content could not be swapped into the target directory.
    /// The previous target (if any) has been restored.
    #[error("failed to replace {}: {source}", target.display())]
    MaterializationFailed {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The swap failed and the backup could not be renamed back either. The
    /// previous content still exists at `backup`; manual intervention is
    /// required.
    #[error(
        "failed to restore {} to {} after a failed swap; \
         the previous content is still available at {}: {source}",
        backup.display(),
        target.display(),
        backup.display()
    )]
    BackupRestoreFailed {
        target: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

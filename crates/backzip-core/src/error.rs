//! Error types for backup archive assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `BackupError`.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors that can occur while assembling or handing off a backup archive.
///
/// Every variant is fatal for the run: the engine never skips a file because
/// of an I/O failure, it only skips files deliberately excluded by the
/// inclusion policy.
#[derive(Error, Debug)]
pub enum BackupError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O operation on a specific path failed.
    #[error("cannot {action} {}: {source}", path.display())]
    PathIo {
        /// What was being attempted ("read", "list", "create", ...).
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configured source directory does not exist.
    #[error("source directory not found: {}", path.display())]
    SourceNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Configured source path exists but is not a directory.
    #[error("source is not a directory: {}", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// Directory traversal failed.
    #[error("failed to walk {}: {message}", path.display())]
    Walk {
        /// Path at which traversal failed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Following symlinks led back to an ancestor directory.
    #[error("symlink loop detected: {} points back to {}", path.display(), ancestor.display())]
    SymlinkLoop {
        /// The link that closes the loop.
        path: PathBuf,
        /// The ancestor directory it points to.
        ancestor: PathBuf,
    },

    /// The ZIP writer rejected an operation.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive entry name could not be derived.
    #[error("cannot derive archive entry name for {}: {reason}", path.display())]
    InvalidEntryName {
        /// The source path.
        path: PathBuf,
        /// Why the name is invalid.
        reason: String,
    },

    /// Two configured directories map to the same entry name.
    #[error("duplicate archive entry {name}: {} and {} share a final path segment", first.display(), second.display())]
    DuplicateEntryName {
        /// The colliding entry name.
        name: String,
        /// The first directory producing the name.
        first: PathBuf,
        /// The later directory producing the name.
        second: PathBuf,
    },

    /// Configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration was rejected.
        reason: String,
    },

    /// Configuration could not be (de)serialized.
    #[error("configuration serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The upload collaborator reported a failure.
    #[error("upload of {name} failed: {reason}")]
    Upload {
        /// Name of the archive being uploaded.
        name: String,
        /// Transport-level reason.
        reason: String,
    },
}

impl BackupError {
    /// Returns `true` if this error came from the filesystem.
    ///
    /// # Examples
    ///
    /// ```
    /// use backzip_core::BackupError;
    /// use std::path::PathBuf;
    ///
    /// let err = BackupError::SourceNotFound {
    ///     path: PathBuf::from("/srv/missing"),
    /// };
    /// assert!(err.is_filesystem());
    ///
    /// let err = BackupError::InvalidConfig {
    ///     reason: "no directories".into(),
    /// };
    /// assert!(!err.is_filesystem());
    /// ```
    #[must_use]
    pub const fn is_filesystem(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::PathIo { .. }
                | Self::SourceNotFound { .. }
                | Self::NotADirectory { .. }
                | Self::Walk { .. }
                | Self::SymlinkLoop { .. }
        )
    }

    /// Returns the path this error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::PathIo { path, .. }
            | Self::SourceNotFound { path }
            | Self::NotADirectory { path }
            | Self::Walk { path, .. }
            | Self::SymlinkLoop { path, .. }
            | Self::InvalidEntryName { path, .. } => Some(path),
            Self::DuplicateEntryName { second, .. } => Some(second),
            _ => None,
        }
    }

    pub(crate) fn path_io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathIo {
            action,
            path: path.into(),
            source,
        }
    }
}

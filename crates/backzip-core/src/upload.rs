//! Handoff of the finished archive to an upload collaborator.
//!
//! The engine does not talk to remote storage itself. It opens the finished
//! archive, describes it with an `UploadRequest` and passes it to an
//! `Uploader`. Authentication, chunking and retries are the uploader's
//! business; any failure it reports is fatal for the run.

use crate::BackupError;
use crate::Result;
use crate::naming;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

/// Description of an archive ready for upload.
pub struct UploadRequest<'a> {
    /// Base name of the archive file.
    pub name: &'a str,

    /// MIME type of the content (`application/zip`).
    pub mime_type: &'a str,

    /// Identifier of the target container (folder, bucket, ...).
    pub target_id: &'a str,

    /// Content length in bytes.
    pub size: u64,

    /// Archive bytes, positioned at offset 0.
    pub content: &'a mut dyn Read,
}

/// Identifier the storage assigned to the uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle(pub String);

impl std::fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upload collaborator.
///
/// Implementations return `BackupError::Upload` for transport failures.
pub trait Uploader {
    /// Stores the archive described by `request`.
    fn upload(&self, request: UploadRequest<'_>) -> Result<RemoteHandle>;
}

/// Opens the finished archive at `path` and hands it to `uploader`.
///
/// # Examples
///
/// ```no_run
/// use backzip_core::upload::DirectoryUploader;
/// use backzip_core::upload::hand_off;
/// use std::path::Path;
///
/// let uploader = DirectoryUploader::new("/mnt/share");
/// let handle = hand_off(Path::new("backup_2024-01-01T00-00-00.zip"), "nightly", &uploader)?;
/// println!("stored as {handle}");
/// # Ok::<(), backzip_core::BackupError>(())
/// ```
pub fn hand_off(path: &Path, target_id: &str, uploader: &dyn Uploader) -> Result<RemoteHandle> {
    let mut file = File::open(path).map_err(|e| BackupError::path_io("open", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| BackupError::path_io("stat", path, e))?
        .len();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BackupError::InvalidEntryName {
            path: path.to_path_buf(),
            reason: "archive path has no UTF-8 file name".to_string(),
        })?;

    info!(name, size, target_id, "uploading backup archive");
    let handle = uploader.upload(UploadRequest {
        name,
        mime_type: naming::ZIP_MIME_TYPE,
        target_id,
        size,
        content: &mut file,
    })?;
    info!(name, handle = %handle, "upload finished");

    Ok(handle)
}

/// Uploader that stores archives under a local or mounted directory.
///
/// The archive lands at `<root>/<target_id>/<name>`; the handle is that path.
/// Content is written to a `.part` file next to it and renamed into place.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    /// Creates an uploader writing below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn write_part(part: &Path, content: &mut dyn Read) -> std::result::Result<u64, String> {
        let mut out = File::create(part)
            .map_err(|e| format!("cannot create {}: {e}", part.display()))?;
        let copied = std::io::copy(content, &mut out).map_err(|e| format!("write failed: {e}"))?;
        out.sync_all().map_err(|e| format!("sync failed: {e}"))?;
        Ok(copied)
    }

    fn fail(name: &str, reason: impl std::fmt::Display) -> BackupError {
        BackupError::Upload {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Uploader for DirectoryUploader {
    fn upload(&self, request: UploadRequest<'_>) -> Result<RemoteHandle> {
        let name = request.name;
        if !naming::is_single_segment(name) || !naming::is_single_segment(request.target_id) {
            return Err(Self::fail(name, "name and target id must be single path segments"));
        }

        let dir = self.root.join(request.target_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| Self::fail(name, format!("cannot create {}: {e}", dir.display())))?;

        // The destination may be the archive being read, so it is only
        // replaced once the copy is complete.
        let dest = dir.join(name);
        let part = dir.join(format!(".{name}.part"));
        let copied = match Self::write_part(&part, request.content) {
            Ok(copied) => copied,
            Err(reason) => {
                let _ = std::fs::remove_file(&part);
                return Err(Self::fail(name, reason));
            }
        };

        if copied != request.size {
            let _ = std::fs::remove_file(&part);
            return Err(Self::fail(
                name,
                format!("size mismatch: expected {} bytes, wrote {copied}", request.size),
            ));
        }

        std::fs::rename(&part, &dest).map_err(|e| {
            let _ = std::fs::remove_file(&part);
            Self::fail(name, format!("cannot move into {}: {e}", dest.display()))
        })?;

        Ok(RemoteHandle(dest.display().to_string()))
    }
}

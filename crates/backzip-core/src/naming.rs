//! Output and entry naming.

use crate::BackupError;
use crate::Result;
use chrono::NaiveDateTime;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Name of the outer archive entry holding the configuration snapshot.
pub const CONFIG_ENTRY_NAME: &str = "backup.conf";

/// Extension of the outer archive and of every per-directory entry.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// MIME type handed to the upload collaborator.
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Sortable, filesystem-safe timestamp layout with second precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Builds the path of the finished backup archive.
///
/// The timestamp is local wall-clock time supplied by the caller, which keeps
/// the function deterministic.
///
/// # Examples
///
/// ```
/// use backzip_core::naming::backup_file_name;
/// use chrono::NaiveDate;
/// use std::path::Path;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
///     .and_then(|d| d.and_hms_opt(14, 5, 7))
///     .unwrap();
/// let path = backup_file_name(Path::new("/var/backups"), "backup", ts);
/// assert_eq!(path, Path::new("/var/backups/backup_2024-03-09T14-05-07.zip"));
/// ```
#[must_use]
pub fn backup_file_name(local_folder: &Path, prefix: &str, timestamp: NaiveDateTime) -> PathBuf {
    local_folder.join(format!(
        "{prefix}_{}.{ARCHIVE_EXTENSION}",
        timestamp.format(TIMESTAMP_FORMAT)
    ))
}

/// Derives the outer entry name for a configured directory.
///
/// Uses the last path segment plus `.zip`. Trailing separators are ignored;
/// a relative path without a final segment (`.`, `..`) is resolved against
/// the current directory first.
///
/// # Errors
///
/// Returns `InvalidEntryName` if no final segment exists (e.g. `/`) or it is
/// not valid UTF-8.
///
/// # Examples
///
/// ```
/// use backzip_core::naming::directory_entry_name;
/// use std::path::Path;
///
/// assert_eq!(directory_entry_name(Path::new("/var/log/")).unwrap(), "log.zip");
/// assert!(directory_entry_name(Path::new("/")).is_err());
/// ```
pub fn directory_entry_name(path: &Path) -> Result<String> {
    let resolved;
    let segment = match path.file_name() {
        Some(name) => name,
        None => {
            resolved = std::fs::canonicalize(path).map_err(|e| BackupError::InvalidEntryName {
                path: path.to_path_buf(),
                reason: format!("path has no final segment and cannot be resolved: {e}"),
            })?;
            resolved
                .file_name()
                .ok_or_else(|| BackupError::InvalidEntryName {
                    path: path.to_path_buf(),
                    reason: "path has no final segment".to_string(),
                })?
        }
    };

    let segment = segment.to_str().ok_or_else(|| BackupError::InvalidEntryName {
        path: path.to_path_buf(),
        reason: "final segment is not valid UTF-8".to_string(),
    })?;

    Ok(format!("{segment}.{ARCHIVE_EXTENSION}"))
}

/// Converts a path relative to a source root into a ZIP entry name.
///
/// ZIP names always use `/`, whatever the platform separator.
pub fn relative_entry_name(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| BackupError::InvalidEntryName {
                    path: relative.to_path_buf(),
                    reason: "path is not valid UTF-8".to_string(),
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(BackupError::InvalidEntryName {
                    path: relative.to_path_buf(),
                    reason: "path is not relative to the source root".to_string(),
                });
            }
        }
    }

    if parts.is_empty() {
        return Err(BackupError::InvalidEntryName {
            path: relative.to_path_buf(),
            reason: "empty entry name".to_string(),
        });
    }

    Ok(parts.join("/"))
}

/// Checks that `name` is exactly one normal path segment.
///
/// Rejects empty names, `.`, `..`, and anything containing a separator.
///
/// # Examples
///
/// ```
/// use backzip_core::naming::is_single_segment;
///
/// assert!(is_single_segment("nightly"));
/// assert!(!is_single_segment(".."));
/// assert!(!is_single_segment("a/b"));
/// ```
#[must_use]
pub fn is_single_segment(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

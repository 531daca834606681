//! Error conversion utilities for CLI.
//!
//! Converts backzip-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use backzip_core::BackupError;
use std::path::Path;

/// Converts `BackupError` to user-friendly anyhow error with context.
///
/// `config` is the configuration file the run was started with.
pub fn convert_backup_error(err: BackupError, config: &Path) -> anyhow::Error {
    match err {
        BackupError::SourceNotFound { path } | BackupError::NotADirectory { path } => {
            anyhow!(
                "Source directory '{}' is missing or not a directory\n\
                 HINT: Check the \"dirs\" entries in '{}'.",
                path.display(),
                config.display()
            )
        }
        BackupError::PathIo {
            action,
            path,
            source,
        } => {
            anyhow!(
                "Cannot {action} '{}': {source}\n\
                 HINT: Check that the path stays readable for the whole run.",
                path.display()
            )
        }
        BackupError::SymlinkLoop { path, ancestor } => {
            anyhow!(
                "Symlink loop: '{}' points back to '{}'\n\
                 HINT: Set \"symlinks\": \"skip\" in '{}' to archive without following links.",
                path.display(),
                ancestor.display(),
                config.display()
            )
        }
        BackupError::DuplicateEntryName {
            name,
            first,
            second,
        } => {
            anyhow!(
                "'{}' and '{}' would both be stored as '{name}'\n\
                 HINT: Set \"name_collision\" to \"rename\" or \"overwrite\" in '{}'.",
                first.display(),
                second.display(),
                config.display()
            )
        }
        BackupError::InvalidConfig { reason } => {
            anyhow!(
                "Invalid configuration '{}': {reason}",
                config.display()
            )
        }
        BackupError::Serialization(e) => {
            anyhow!(
                "Cannot parse configuration '{}': {e}\n\
                 HINT: The file must contain a JSON object with a \"dirs\" list.",
                config.display()
            )
        }
        BackupError::Upload { name, reason } => {
            anyhow!(
                "Upload of '{name}' failed: {reason}\n\
                 HINT: The local archive was kept. Use --skip-upload to skip the upload step."
            )
        }
        _ => anyhow::Error::from(err).context("Backup failed"),
    }
}

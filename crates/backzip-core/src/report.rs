//! Backup run reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Statistics gathered while building one nested archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Files written into the nested archive.
    pub files_added: usize,

    /// Files left out by the inclusion policy.
    pub files_excluded: usize,

    /// Symlinks and special files that were not archived.
    pub entries_skipped: usize,

    /// Total bytes read from source files.
    pub bytes_read: u64,
}

/// Outcome for one configured directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryReport {
    /// Configured root path.
    pub source: PathBuf,

    /// Entry name in the outer archive.
    pub entry_name: String,

    /// Walk and filter statistics.
    pub stats: ArchiveStats,

    /// Size of the nested archive in bytes.
    pub archive_size: u64,

    /// `true` when a later directory with the same entry name replaced this
    /// one, so its archive is not in the output.
    pub overwritten: bool,
}

/// Report of a complete backup run.
///
/// # Examples
///
/// ```
/// use backzip_core::BackupReport;
///
/// let report = BackupReport::default();
/// assert_eq!(report.entry_count(), 1); // configuration entry only
/// assert_eq!(report.files_added(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BackupReport {
    /// Path of the finished archive.
    pub output: PathBuf,

    /// Per-directory results, in configured order.
    pub directories: Vec<DirectoryReport>,

    /// Size of the embedded configuration snapshot.
    pub config_size: u64,

    /// Size of the finished archive on disk.
    pub archive_size: u64,

    /// Wall-clock duration of the run.
    pub duration: Duration,

    /// Warnings generated during the run.
    pub warnings: Vec<String>,
}

impl BackupReport {
    /// Creates an empty report for `output`.
    #[must_use]
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of entries in the outer archive.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        1 + self.directories.iter().filter(|d| !d.overwritten).count()
    }

    /// Files archived across all written directories.
    #[must_use]
    pub fn files_added(&self) -> usize {
        self.written().map(|d| d.stats.files_added).sum()
    }

    /// Files excluded by inclusion rules across all directories.
    #[must_use]
    pub fn files_excluded(&self) -> usize {
        self.directories.iter().map(|d| d.stats.files_excluded).sum()
    }

    /// Source bytes archived across all written directories.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.written().map(|d| d.stats.bytes_read).sum()
    }

    fn written(&self) -> impl Iterator<Item = &DirectoryReport> {
        self.directories.iter().filter(|d| !d.overwritten)
    }
}

//! High-level public API for backup runs.

use chrono::NaiveDateTime;

use crate::BackupConfig;
use crate::BackupReport;
use crate::Result;
use crate::composer::BackupJob;
use crate::composer::build_backup_archive;
use crate::naming;
use crate::progress::NoopProgress;
use crate::progress::ProgressCallback;

/// Builds a backup archive according to `config`.
///
/// The archive is written to
/// `<local_folder>/<file_prefix>_<timestamp>.zip`, where `timestamp` is the
/// caller's local wall-clock time.
///
/// # Arguments
///
/// * `config` - Validated backup configuration
/// * `timestamp` - Local time used in the archive file name
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized, a source
/// directory cannot be read, or the archive cannot be written.
///
/// # Examples
///
/// ```no_run
/// use backzip_core::BackupConfig;
/// use backzip_core::create_backup;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BackupConfig::load("backzip.json")?;
/// let report = create_backup(&config, chrono::Local::now().naive_local())?;
/// println!("Wrote {}", report.output.display());
/// # Ok(())
/// # }
/// ```
pub fn create_backup(config: &BackupConfig, timestamp: NaiveDateTime) -> Result<BackupReport> {
    create_backup_with_progress(config, timestamp, &mut NoopProgress)
}

/// Builds a backup archive with progress reporting.
///
/// Same as [`create_backup`], with callbacks for each configured directory.
pub fn create_backup_with_progress(
    config: &BackupConfig,
    timestamp: NaiveDateTime,
    progress: &mut dyn ProgressCallback,
) -> Result<BackupReport> {
    let output = naming::backup_file_name(&config.local_folder, &config.file_prefix, timestamp);
    let job = BackupJob::from_config(config, output)?;
    build_backup_archive(&job, progress)
}

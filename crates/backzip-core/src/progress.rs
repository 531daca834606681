//! Progress callbacks for backup runs.

use crate::report::DirectoryReport;
use std::path::Path;

/// Callback trait for progress reporting during a backup run.
///
/// Callbacks are always invoked on the thread driving the run, in configured
/// directory order, even when nested archives are built concurrently.
///
/// # Examples
///
/// ```
/// use backzip_core::DirectoryReport;
/// use backzip_core::ProgressCallback;
/// use std::path::Path;
///
/// struct PrintProgress;
///
/// impl ProgressCallback for PrintProgress {
///     fn on_directory_start(&mut self, source: &Path, total: usize, current: usize) {
///         println!("[{current}/{total}] {}", source.display());
///     }
///
///     fn on_directory_complete(&mut self, report: &DirectoryReport) {
///         println!("  {} files", report.stats.files_added);
///     }
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before a directory's archive is built (or merged).
    ///
    /// `current` is 1-based.
    fn on_directory_start(&mut self, source: &Path, total: usize, current: usize);

    /// Called after a directory's archive has been merged into the output.
    fn on_directory_complete(&mut self, report: &DirectoryReport);

    /// Called once after the outer archive has been finalized.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_directory_start(&mut self, _source: &Path, _total: usize, _current: usize) {}

    fn on_directory_complete(&mut self, _report: &DirectoryReport) {}

    fn on_complete(&mut self) {}
}

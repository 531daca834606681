//! Outer archive composition.
//!
//! The outer archive holds the configuration snapshot as `backup.conf`,
//! followed by one entry per configured directory whose content is that
//! directory's nested archive, copied verbatim.

use crate::BackupError;
use crate::Result;
use crate::archiver;
use crate::archiver::NestedArchive;
use crate::config::BackupConfig;
use crate::config::JobOptions;
use crate::config::NameCollision;
use crate::config::SourceDir;
use crate::naming;
use crate::progress::ProgressCallback;
use crate::report::BackupReport;
use crate::report::DirectoryReport;
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing::warn;
use zip::ZipWriter;

/// Everything needed for one backup run.
///
/// # Examples
///
/// ```
/// use backzip_core::BackupJob;
/// use backzip_core::SourceDir;
///
/// let job = BackupJob::new(
///     "/var/backups/backup_2024-01-01T00-00-00.zip",
///     vec![SourceDir::new("/etc")],
///     b"{}".to_vec(),
/// );
/// assert_eq!(job.dirs.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BackupJob {
    /// Destination of the outer archive.
    pub output: PathBuf,

    /// Source directories in entry order.
    pub dirs: Vec<SourceDir>,

    /// Bytes stored as `backup.conf`.
    pub config_snapshot: Vec<u8>,

    /// Archive-building options.
    pub options: JobOptions,
}

impl BackupJob {
    /// Creates a job with default options.
    #[must_use]
    pub fn new(output: impl Into<PathBuf>, dirs: Vec<SourceDir>, config_snapshot: Vec<u8>) -> Self {
        Self {
            output: output.into(),
            dirs,
            config_snapshot,
            options: JobOptions::default(),
        }
    }

    /// Creates a job from a configuration, embedding its snapshot.
    pub fn from_config(config: &BackupConfig, output: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            output: output.into(),
            dirs: config.dirs.clone(),
            config_snapshot: config.to_snapshot()?,
            options: config.job_options(),
        })
    }

    /// Sets the archive-building options.
    #[must_use]
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }
}

/// Where one configured directory lands in the outer archive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedEntry {
    name: String,
    /// `false` when a later directory overwrites this name.
    written: bool,
}

/// Builds the outer backup archive for `job`.
///
/// Steps, each fatal on failure:
/// 1. create missing parent directories and the output file
/// 2. write `backup.conf` with the configuration snapshot
/// 3. build each directory's nested archive and copy it into an entry named
///    after the directory's final path segment, in configured order
/// 4. write the central directory and flush the file
///
/// With `JobOptions::parallel`, nested archives are built concurrently and
/// merged in configured order once all of them are done. Either way the
/// run fails with the error of the earliest failing directory in configured
/// order.
///
/// On failure a partially written output file may remain on disk.
///
/// # Examples
///
/// ```no_run
/// use backzip_core::BackupJob;
/// use backzip_core::NoopProgress;
/// use backzip_core::SourceDir;
/// use backzip_core::composer::build_backup_archive;
///
/// let job = BackupJob::new("out/backup.zip", vec![SourceDir::new("/etc")], b"{}".to_vec());
/// let report = build_backup_archive(&job, &mut NoopProgress)?;
/// println!("{} entries", report.entry_count());
/// # Ok::<(), backzip_core::BackupError>(())
/// ```
pub fn build_backup_archive(
    job: &BackupJob,
    progress: &mut dyn ProgressCallback,
) -> Result<BackupReport> {
    let start = Instant::now();
    let plan = plan_entries(&job.dirs, job.options.name_collision)?;

    if let Some(parent) = job.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| BackupError::path_io("create", parent, e))?;
    }
    let file =
        File::create(&job.output).map_err(|e| BackupError::path_io("create", &job.output, e))?;
    info!(output = %job.output.display(), dirs = job.dirs.len(), "creating backup archive");

    let mut zip = ZipWriter::new(BufWriter::new(file));
    let mut report = BackupReport::new(&job.output);

    zip.start_file(
        naming::CONFIG_ENTRY_NAME,
        archiver::file_options(job.options.compression_level),
    )?;
    zip.write_all(&job.config_snapshot)?;
    report.config_size = job.config_snapshot.len() as u64;

    let total = job.dirs.len();
    if job.options.parallel {
        // The reported error is the first one in configured order.
        let built: Vec<Result<NestedArchive>> = job
            .dirs
            .par_iter()
            .map(|dir| archiver::build_nested_archive(dir, &job.options))
            .collect();
        let nested = built.into_iter().collect::<Result<Vec<_>>>()?;

        for (idx, (nested, entry)) in nested.into_iter().zip(&plan).enumerate() {
            progress.on_directory_start(&nested.source, total, idx + 1);
            let dir_report = merge_entry(&mut zip, nested, entry, &mut report)?;
            progress.on_directory_complete(&dir_report);
            report.directories.push(dir_report);
        }
    } else {
        for (idx, (dir, entry)) in job.dirs.iter().zip(&plan).enumerate() {
            progress.on_directory_start(&dir.path, total, idx + 1);
            let nested = archiver::build_nested_archive(dir, &job.options)?;
            let dir_report = merge_entry(&mut zip, nested, entry, &mut report)?;
            progress.on_directory_complete(&dir_report);
            report.directories.push(dir_report);
        }
    }

    let writer = zip.finish()?;
    let file = writer.into_inner().map_err(|e| {
        BackupError::path_io("write", &job.output, e.into_error())
    })?;
    report.archive_size = file
        .metadata()
        .map_err(|e| BackupError::path_io("stat", &job.output, e))?
        .len();
    report.duration = start.elapsed();

    info!(
        output = %job.output.display(),
        entries = report.entry_count(),
        size = report.archive_size,
        "backup archive finished"
    );
    progress.on_complete();

    Ok(report)
}

/// Copies one nested archive into the outer archive, unless a later
/// directory overwrites its name.
fn merge_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    nested: NestedArchive,
    entry: &PlannedEntry,
    report: &mut BackupReport,
) -> Result<DirectoryReport> {
    let archive_size = nested.size();

    if entry.written {
        zip.start_file(entry.name.as_str(), archiver::stored_options(archive_size))?;
        zip.write_all(&nested.bytes)?;
    } else {
        warn!(
            source = %nested.source.display(),
            entry = %entry.name,
            "entry name reused by a later directory, archive replaced"
        );
        report.add_warning(format!(
            "{} replaced by a later directory with the same name ({})",
            nested.source.display(),
            entry.name
        ));
    }

    Ok(DirectoryReport {
        source: nested.source,
        entry_name: entry.name.clone(),
        stats: nested.stats,
        archive_size,
        overwritten: !entry.written,
    })
}

/// Derives every directory's entry name and applies the collision policy.
fn plan_entries(dirs: &[SourceDir], policy: NameCollision) -> Result<Vec<PlannedEntry>> {
    let names = dirs
        .iter()
        .map(|d| naming::directory_entry_name(&d.path))
        .collect::<Result<Vec<_>>>()?;

    match policy {
        NameCollision::Overwrite => {
            let mut last_index: HashMap<&str, usize> = HashMap::new();
            for (idx, name) in names.iter().enumerate() {
                last_index.insert(name.as_str(), idx);
            }
            Ok(names
                .iter()
                .enumerate()
                .map(|(idx, name)| PlannedEntry {
                    written: last_index.get(name.as_str()) == Some(&idx),
                    name: name.clone(),
                })
                .collect())
        }
        NameCollision::Error => {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for (idx, name) in names.iter().enumerate() {
                if let Some(&first) = seen.get(name.as_str()) {
                    return Err(BackupError::DuplicateEntryName {
                        name: name.clone(),
                        first: dirs[first].path.clone(),
                        second: dirs[idx].path.clone(),
                    });
                }
                seen.insert(name.as_str(), idx);
            }
            Ok(names
                .into_iter()
                .map(|name| PlannedEntry {
                    name,
                    written: true,
                })
                .collect())
        }
        NameCollision::Rename => {
            let mut taken: HashSet<String> = names.iter().cloned().collect();
            let mut used: HashSet<String> = HashSet::new();
            let mut plan = Vec::with_capacity(names.len());
            for name in names {
                let name = if used.contains(&name) {
                    let stem = name
                        .strip_suffix(&format!(".{}", naming::ARCHIVE_EXTENSION))
                        .unwrap_or(&name)
                        .to_string();
                    let mut n = 2;
                    loop {
                        let candidate = format!("{stem}-{n}.{}", naming::ARCHIVE_EXTENSION);
                        if !taken.contains(&candidate) {
                            taken.insert(candidate.clone());
                            break candidate;
                        }
                        n += 1;
                    }
                } else {
                    name
                };
                used.insert(name.clone());
                plan.push(PlannedEntry {
                    name,
                    written: true,
                });
            }
            Ok(plan)
        }
    }
}

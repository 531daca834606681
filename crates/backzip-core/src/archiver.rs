//! Per-directory nested archive construction.
//!
//! Each configured directory becomes one complete ZIP held in memory. Only
//! names and contents are stored: permissions are fixed at `0o644` and every
//! entry carries the same DOS timestamp, so identical trees produce
//! identical bytes.

use crate::BackupError;
use crate::Result;
use crate::config::JobOptions;
use crate::config::SourceDir;
use crate::policy;
use crate::report::ArchiveStats;
use crate::walker::EntryKind;
use crate::walker::SourceWalker;
use crate::walker::WalkedEntry;
use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Entries at or above this size need ZIP64 headers.
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

/// A finished in-memory archive of one source directory.
#[derive(Debug, Clone)]
pub struct NestedArchive {
    /// Root of the archived directory.
    pub source: PathBuf,

    /// Complete ZIP bytes, central directory included.
    pub bytes: Vec<u8>,

    /// Walk and filter statistics.
    pub stats: ArchiveStats,
}

impl NestedArchive {
    /// Size of the archive in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Builds the nested archive for one configured directory.
///
/// Walks the rule's root depth-first, asks the inclusion policy about every
/// file and writes each included file as one entry named by its path
/// relative to the root (`B/inner.txt`). An empty directory yields a valid
/// archive with no entries.
///
/// # Examples
///
/// ```no_run
/// use backzip_core::JobOptions;
/// use backzip_core::SourceDir;
/// use backzip_core::archiver::build_nested_archive;
///
/// let rule = SourceDir::new("/etc/nginx").with_exclude(vec!["*.log".to_string()]);
/// let nested = build_nested_archive(&rule, &JobOptions::default())?;
/// println!("{} files, {} bytes", nested.stats.files_added, nested.size());
/// # Ok::<(), backzip_core::BackupError>(())
/// ```
///
/// # Errors
///
/// Any failure is fatal for the directory; nothing is skipped on error:
/// - the root does not exist or is not a directory
/// - a directory cannot be listed or a file cannot be opened or read
/// - a symlink loop is found while following links
/// - the ZIP writer fails
pub fn build_nested_archive(rule: &SourceDir, options: &JobOptions) -> Result<NestedArchive> {
    check_root(&rule.path)?;
    info!(source = %rule.path.display(), "archiving directory");

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut stats = ArchiveStats::default();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    let walker = SourceWalker::new(&rule.path, options.symlinks);
    for entry in walker.walk() {
        let entry = entry?;

        match entry.kind {
            EntryKind::File => {
                if !policy::should_include(rule, &entry.path) {
                    debug!(path = %entry.path.display(), "excluded by rule");
                    stats.files_excluded += 1;
                    continue;
                }
                stats.bytes_read +=
                    add_file(&mut zip, &entry, options.compression_level, &mut buffer)?;
                stats.files_added += 1;
            }
            EntryKind::Symlink => {
                debug!(path = %entry.path.display(), "skipping symlink");
                stats.entries_skipped += 1;
            }
            EntryKind::Special => {
                debug!(path = %entry.path.display(), "skipping special file");
                stats.entries_skipped += 1;
            }
        }
    }

    let bytes = zip.finish()?.into_inner();

    info!(
        source = %rule.path.display(),
        files = stats.files_added,
        excluded = stats.files_excluded,
        size = bytes.len(),
        "directory archived"
    );

    Ok(NestedArchive {
        source: rule.path.clone(),
        bytes,
        stats,
    })
}

/// Options for a file entry: deflated at `level`, or stored when `level` is
/// 0, with fixed permissions and timestamp.
pub(crate) fn file_options(level: u8) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)))
    }
}

/// Options for an entry whose content is already compressed.
pub(crate) fn stored_options(size: u64) -> SimpleFileOptions {
    file_options(0).large_file(size >= LARGE_FILE_THRESHOLD)
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BackupError::SourceNotFound {
                path: root.to_path_buf(),
            }
        } else {
            BackupError::path_io("stat", root, e)
        }
    })?;

    if !metadata.is_dir() {
        return Err(BackupError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    Ok(())
}

/// Copies one file into the archive, returning the number of bytes read.
fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry: &WalkedEntry,
    level: u8,
    buffer: &mut [u8],
) -> Result<u64> {
    let mut file = File::open(&entry.path).map_err(|e| BackupError::path_io("open", &entry.path, e))?;
    let size = file
        .metadata()
        .map_err(|e| BackupError::path_io("stat", &entry.path, e))?
        .len();

    let options = file_options(level).large_file(size >= LARGE_FILE_THRESHOLD);
    zip.start_file(entry.archive_name.as_str(), options)?;

    let mut bytes_read = 0u64;
    loop {
        let n = file
            .read(buffer)
            .map_err(|e| BackupError::path_io("read", &entry.path, e))?;
        if n == 0 {
            break;
        }
        zip.write_all(&buffer[..n])?;
        bytes_read += n as u64;
    }

    debug!(entry = %entry.archive_name, bytes = bytes_read, "added file");
    Ok(bytes_read)
}

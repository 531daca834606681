//! Depth-first traversal of a configured source directory.
//!
//! The walker yields every non-directory entry below the root in a stable
//! order (sorted by file name at each level), together with its archive
//! entry name relative to the root. Directories themselves are never
//! yielded and never pruned: inclusion is decided per file by the archiver.

use crate::BackupError;
use crate::Result;
use crate::config::SymlinkPolicy;
use crate::naming;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Walks one source directory.
///
/// # Examples
///
/// ```no_run
/// use backzip_core::SymlinkPolicy;
/// use backzip_core::walker::SourceWalker;
/// use std::path::Path;
///
/// let walker = SourceWalker::new(Path::new("/srv/app"), SymlinkPolicy::Skip);
/// for entry in walker.walk() {
///     let entry = entry?;
///     println!("{}", entry.archive_name);
/// }
/// # Ok::<(), backzip_core::BackupError>(())
/// ```
pub struct SourceWalker<'a> {
    root: &'a Path,
    symlinks: SymlinkPolicy,
}

impl<'a> SourceWalker<'a> {
    /// Creates a walker rooted at `root`.
    #[must_use]
    pub fn new(root: &'a Path, symlinks: SymlinkPolicy) -> Self {
        Self { root, symlinks }
    }

    /// Returns an iterator over the entries below the root.
    ///
    /// With `SymlinkPolicy::Follow`, links are resolved and a link pointing
    /// back to one of its ancestors yields `SymlinkLoop`. With
    /// `SymlinkPolicy::Skip`, links are reported as `EntryKind::Symlink` and
    /// never resolved.
    ///
    /// # Errors
    ///
    /// Items are errors when a directory cannot be listed, an entry's
    /// metadata cannot be read, or an entry name cannot be derived. The
    /// caller is expected to stop at the first error.
    pub fn walk(&self) -> impl Iterator<Item = Result<WalkedEntry>> + '_ {
        WalkDir::new(self.root)
            .follow_links(self.symlinks == SymlinkPolicy::Follow)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => Some(self.build_entry(&entry)),
                Err(e) => Some(Err(convert_walk_error(self.root, e))),
            })
    }

    fn build_entry(&self, entry: &walkdir::DirEntry) -> Result<WalkedEntry> {
        let path = entry.path().to_path_buf();
        let file_type = entry.file_type();

        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Special
        };

        let relative = path
            .strip_prefix(self.root)
            .map_err(|_| BackupError::Walk {
                path: path.clone(),
                message: format!("entry is not under root {}", self.root.display()),
            })?;
        let archive_name = naming::relative_entry_name(relative)?;

        Ok(WalkedEntry {
            path,
            archive_name,
            kind,
        })
    }
}

/// A non-directory entry found below a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedEntry {
    /// Full filesystem path.
    pub path: PathBuf,

    /// Entry name inside the nested archive (`B/inner.txt`).
    pub archive_name: String,

    /// What kind of entry this is.
    pub kind: EntryKind,
}

/// Type of a walked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (or, when following links, a link resolving to one).
    File,

    /// Unresolved symbolic link.
    Symlink,

    /// Socket, FIFO, device node or similar.
    Special,
}

fn convert_walk_error(root: &Path, err: walkdir::Error) -> BackupError {
    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);

    if let Some(ancestor) = err.loop_ancestor() {
        return BackupError::SymlinkLoop {
            path,
            ancestor: ancestor.to_path_buf(),
        };
    }

    let message = err.to_string();
    match err.into_io_error() {
        Some(source) => BackupError::path_io("list", path, source),
        None => BackupError::Walk { path, message },
    }
}

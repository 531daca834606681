//! Backup configuration.
//!
//! The configuration is read from a JSON document, validated, and a
//! pretty-printed copy of it is embedded in every backup as `backup.conf`.

use crate::BackupError;
use crate::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Default filename prefix for backup archives.
pub const DEFAULT_FILE_PREFIX: &str = "backup";

/// Default deflate level for archive entries.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// Complete configuration of a backup run.
///
/// # Examples
///
/// ```
/// use backzip_core::BackupConfig;
/// use backzip_core::SourceDir;
///
/// let config = BackupConfig::default()
///     .with_local_folder("/var/backups")
///     .with_dir(SourceDir::new("/etc").with_exclude(vec!["*.log".to_string()]));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Folder the finished archive is written to.
    ///
    /// Default: `.`.
    pub local_folder: PathBuf,

    /// Prefix of the archive file name (`<prefix>_<timestamp>.zip`).
    ///
    /// Default: `"backup"`.
    pub file_prefix: String,

    /// Source directories, archived in this order.
    pub dirs: Vec<SourceDir>,

    /// Upload target. `None` keeps the archive local only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,

    /// Deflate level (1-9), or 0 to store entries uncompressed.
    ///
    /// Default: `6`.
    pub compression_level: u8,

    /// How symbolic links inside source directories are treated.
    pub symlinks: SymlinkPolicy,

    /// What happens when two directories share a final path segment.
    pub name_collision: NameCollision,

    /// Build per-directory archives concurrently.
    ///
    /// Default: `false`.
    pub parallel: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            local_folder: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            dirs: Vec::new(),
            remote: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            symlinks: SymlinkPolicy::default(),
            name_collision: NameCollision::default(),
            parallel: false,
        }
    }
}

impl BackupConfig {
    /// Reads, parses and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(config_path = %path.display(), "loading configuration");

        let content = std::fs::read_to_string(path)
            .map_err(|e| BackupError::path_io("read", path, e))?;
        let config = Self::from_json(&content)?;

        tracing::debug!(
            config_path = %path.display(),
            dirs = config.dirs.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration snapshot embedded in the archive.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Returns the archive-building options carried by this configuration.
    #[must_use]
    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            compression_level: self.compression_level,
            symlinks: self.symlinks,
            name_collision: self.name_collision,
            parallel: self.parallel,
        }
    }

    /// Sets the local output folder.
    #[must_use]
    pub fn with_local_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.local_folder = folder.into();
        self
    }

    /// Sets the archive file name prefix.
    #[must_use]
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Appends a source directory.
    #[must_use]
    pub fn with_dir(mut self, dir: SourceDir) -> Self {
        self.dirs.push(dir);
        self
    }

    /// Sets the upload target.
    #[must_use]
    pub fn with_remote(mut self, remote: Option<RemoteConfig>) -> Self {
        self.remote = remote;
        self
    }

    /// Sets the compression level.
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets the symlink policy.
    #[must_use]
    pub fn with_symlinks(mut self, policy: SymlinkPolicy) -> Self {
        self.symlinks = policy;
        self
    }

    /// Sets the entry name collision policy.
    #[must_use]
    pub fn with_name_collision(mut self, policy: NameCollision) -> Self {
        self.name_collision = policy;
        self
    }

    /// Enables or disables concurrent directory archiving.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - No source directories are configured
    /// - A source directory path is empty
    /// - The compression level is above 9
    /// - The file prefix is empty or contains a path separator
    /// - A remote target is configured with an empty target id, or one that
    ///   is not a single folder name (`..`, `a/b`)
    pub fn validate(&self) -> Result<()> {
        if self.dirs.is_empty() {
            return Err(invalid("at least one source directory is required"));
        }

        if let Some(dir) = self.dirs.iter().find(|d| d.path.as_os_str().is_empty()) {
            return Err(invalid(format!(
                "source directory path is empty (exclude: {:?})",
                dir.exclude
            )));
        }

        if self.compression_level > 9 {
            return Err(invalid(format!(
                "compression level must be 0-9, got {}",
                self.compression_level
            )));
        }

        if self.file_prefix.is_empty() {
            return Err(invalid("file prefix must not be empty"));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(invalid(format!(
                "file prefix must not contain a path separator: {}",
                self.file_prefix
            )));
        }

        if let Some(remote) = &self.remote {
            if remote.target_id.trim().is_empty() {
                return Err(invalid("remote target id must not be empty"));
            }
            if !crate::naming::is_single_segment(&remote.target_id) {
                return Err(invalid(format!(
                    "remote target id must be a single folder name: {}",
                    remote.target_id
                )));
            }
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> BackupError {
    BackupError::InvalidConfig {
        reason: reason.into(),
    }
}

/// One configured source directory and its inclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDir {
    /// Root of the directory tree to archive.
    pub path: PathBuf,

    /// Patterns of files to leave out (`*.log`, `tmp*`, `cache/*.bin`, ...).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Archive hidden entries. When `false`, files whose name starts with a
    /// dot are left out, as is everything below a dot-directory (`.git/`).
    /// The root's own name is not considered.
    ///
    /// Default: `true`.
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

const fn default_true() -> bool {
    true
}

impl SourceDir {
    /// Creates a rule for `path` that includes every file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exclude: Vec::new(),
            include_hidden: true,
        }
    }

    /// Sets the exclude patterns.
    #[must_use]
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Sets whether hidden files are archived.
    #[must_use]
    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }
}

/// Upload target for the finished archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Root of the storage the uploader writes into.
    pub root: PathBuf,

    /// Container (folder) identifier inside the storage.
    pub target_id: String,
}

/// Treatment of symbolic links found while walking a source directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Leave links out of the archive.
    #[default]
    Skip,
    /// Archive what links point to; a link back to an ancestor is an error.
    Follow,
}

/// Handling of configured directories that derive the same entry name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCollision {
    /// The later directory replaces the earlier one.
    #[default]
    Overwrite,
    /// Fail the run before anything is written.
    Error,
    /// Suffix later duplicates: `logs-2.zip`, `logs-3.zip`, ...
    Rename,
}

/// Options controlling how archives are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// Deflate level (1-9), or 0 to store.
    pub compression_level: u8,
    /// Symlink treatment.
    pub symlinks: SymlinkPolicy,
    /// Entry name collision handling.
    pub name_collision: NameCollision,
    /// Build nested archives concurrently.
    pub parallel: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        BackupConfig::default().job_options()
    }
}

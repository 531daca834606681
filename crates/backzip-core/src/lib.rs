//! Archive assembly engine for directory backups.
//!
//! `backzip-core` walks a set of configured source directories, filters
//! their files through per-directory inclusion rules, packs each directory
//! into its own in-memory ZIP and stores those ZIPs, together with a copy of
//! the configuration, in one outer ZIP archive. The finished archive can
//! then be handed to an upload collaborator.
//!
//! # Examples
//!
//! ```no_run
//! use backzip_core::BackupConfig;
//! use backzip_core::SourceDir;
//! use backzip_core::create_backup;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackupConfig::default()
//!     .with_local_folder("/var/backups")
//!     .with_dir(SourceDir::new("/etc").with_exclude(vec!["*.log".to_string()]));
//! let report = create_backup(&config, chrono::Local::now().naive_local())?;
//! println!("Archived {} files into {}", report.files_added(), report.output.display());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archiver;
pub mod composer;
pub mod config;
pub mod error;
pub mod naming;
pub mod policy;
pub mod progress;
pub mod report;
pub mod upload;
pub mod walker;

// Re-export main API types
pub use api::create_backup;
pub use api::create_backup_with_progress;
pub use composer::BackupJob;
pub use config::BackupConfig;
pub use config::JobOptions;
pub use config::NameCollision;
pub use config::RemoteConfig;
pub use config::SourceDir;
pub use config::SymlinkPolicy;
pub use error::BackupError;
pub use error::Result;
pub use progress::NoopProgress;
pub use progress::ProgressCallback;
pub use report::ArchiveStats;
pub use report::BackupReport;
pub use report::DirectoryReport;
pub use upload::RemoteHandle;
pub use upload::Uploader;

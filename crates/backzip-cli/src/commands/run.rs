//! Run command: build the backup archive and hand it off.

use crate::cli::RunArgs;
use crate::error::convert_backup_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use backzip_core::BackupConfig;
use backzip_core::create_backup;
use backzip_core::create_backup_with_progress;
use backzip_core::upload::DirectoryUploader;
use backzip_core::upload::hand_off;
use chrono::Local;
use tracing::info;

pub fn execute(args: &RunArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    let to_anyhow = |e| convert_backup_error(e, &args.config);

    let mut config = BackupConfig::load(&args.config).map_err(to_anyhow)?;
    if args.parallel {
        config = config.with_parallel(true);
    }

    let timestamp = Local::now().naive_local();
    let report = if !quiet && CliProgress::should_show() {
        let mut progress = CliProgress::new(config.dirs.len(), "Archiving");
        create_backup_with_progress(&config, timestamp, &mut progress)
    } else {
        create_backup(&config, timestamp)
    }
    .map_err(to_anyhow)?;

    let handle = match &config.remote {
        Some(_) if args.skip_upload => {
            info!(output = %report.output.display(), "upload skipped");
            None
        }
        Some(remote) => {
            let uploader = DirectoryUploader::new(&remote.root);
            Some(hand_off(&report.output, &remote.target_id, &uploader).map_err(to_anyhow)?)
        }
        None => None,
    };

    formatter.format_backup_result(&report, handle.as_ref())
}

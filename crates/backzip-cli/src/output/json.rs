//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use backzip_core::BackupReport;
use backzip_core::DirectoryReport;
use backzip_core::RemoteHandle;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

#[derive(Serialize)]
struct DirectoryOutput {
    source: String,
    entry_name: String,
    files_added: usize,
    files_excluded: usize,
    entries_skipped: usize,
    bytes_read: u64,
    archive_size: u64,
    overwritten: bool,
}

impl From<&DirectoryReport> for DirectoryOutput {
    fn from(dir: &DirectoryReport) -> Self {
        Self {
            source: dir.source.display().to_string(),
            entry_name: dir.entry_name.clone(),
            files_added: dir.stats.files_added,
            files_excluded: dir.stats.files_excluded,
            entries_skipped: dir.stats.entries_skipped,
            bytes_read: dir.stats.bytes_read,
            archive_size: dir.archive_size,
            overwritten: dir.overwritten,
        }
    }
}

#[derive(Serialize)]
struct BackupOutput {
    output_path: String,
    entries: usize,
    files_added: usize,
    files_excluded: usize,
    bytes_read: u64,
    archive_size: u64,
    duration_ms: u128,
    directories: Vec<DirectoryOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uploaded_as: Option<String>,
    warnings: Vec<String>,
}

impl BackupOutput {
    fn new(report: &BackupReport, upload: Option<&RemoteHandle>) -> Self {
        Self {
            output_path: report.output.display().to_string(),
            entries: report.entry_count(),
            files_added: report.files_added(),
            files_excluded: report.files_excluded(),
            bytes_read: report.bytes_read(),
            archive_size: report.archive_size,
            duration_ms: report.duration.as_millis(),
            directories: report.directories.iter().map(DirectoryOutput::from).collect(),
            uploaded_as: upload.map(ToString::to_string),
            warnings: report.warnings.clone(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_backup_result(
        &self,
        report: &BackupReport,
        upload: Option<&RemoteHandle>,
    ) -> Result<()> {
        Self::output(&JsonOutput::success("run", BackupOutput::new(report, upload)))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("run", format!("{error:#}"));
        let _ = Self::output(&output);
    }
}

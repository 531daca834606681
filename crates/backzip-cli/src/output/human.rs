//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use backzip_core::BackupReport;
use backzip_core::RemoteHandle;
use console::Term;
use console::style;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn write_warning(&self, message: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_backup_result(
        &self,
        report: &BackupReport,
        upload: Option<&RemoteHandle>,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Backup created: {}",
                style("✓").green().bold(),
                report.output.display()
            ));
        } else {
            let _ = self
                .term
                .write_line(&format!("Backup created: {}", report.output.display()));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "  Directories:      {}",
            Self::format_number(report.directories.len())
        ));
        let _ = self.term.write_line(&format!(
            "  Files added:      {}",
            Self::format_number(report.files_added())
        ));
        if report.files_excluded() > 0 {
            let _ = self.term.write_line(&format!(
                "  Files excluded:   {}",
                Self::format_number(report.files_excluded())
            ));
        }
        let _ = self.term.write_line(&format!(
            "  Source size:      {}",
            Self::format_size(report.bytes_read())
        ));
        let _ = self.term.write_line(&format!(
            "  Archive size:     {}",
            Self::format_size(report.archive_size)
        ));

        if let Some(handle) = upload {
            let _ = self
                .term
                .write_line(&format!("  Uploaded as:      {handle}"));
        }

        if self.verbose {
            let _ = self.term.write_line("");
            for dir in &report.directories {
                let status = if dir.overwritten { " (replaced)" } else { "" };
                let _ = self.term.write_line(&format!(
                    "  {} -> {}{status}: {} files, {}",
                    dir.source.display(),
                    dir.entry_name,
                    Self::format_number(dir.stats.files_added),
                    Self::format_size(dir.archive_size)
                ));
            }
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        if report.has_warnings() {
            let _ = self.term.write_line("");
            for warning in &report.warnings {
                self.write_warning(warning);
            }
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }
}

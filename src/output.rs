//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! the scanning spinner, and the end-of-run summary. The walk itself only
//! emits [`WalkEvent`]s; [`ConsoleReporter`] decides how to show them.

use crate::config::RuleKind;
use crate::file_organizer::{Outcome, Relocation};
use crate::walker::{Reporter, RunSummary, WalkEvent};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Dry-run notices (yellow, `[DRY RUN]` prefix)
/// - The scanning spinner and run summary table
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use forg::output::OutputFormatter;
    /// OutputFormatter::success("Moved invoice-2024.txt");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use forg::output::OutputFormatter;
    /// OutputFormatter::error("failed to move report.txt");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner shown while the source tree is listed.
    ///
    /// The spinner draws to stderr and stays hidden when stderr is not a
    /// terminal.
    pub fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints the counts for a finished run, skipping the zero rows.
    pub fn summary_table(summary: &RunSummary) {
        Self::header("SUMMARY");

        let rows = [
            ("Moved", summary.moved),
            ("Would move", summary.would_move),
            ("Already exists", summary.skipped_existing),
            ("Duplicates deleted", summary.deleted_duplicates),
            ("Duplicates to delete", summary.would_delete_duplicates),
            ("No matching rule", summary.unmatched),
            ("Failed", summary.failed),
            ("Unreadable directories", summary.unreadable_directories),
        ];

        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);

        for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
            let count = match *label {
                "Failed" | "Unreadable directories" => count.to_string().red(),
                _ => count.to_string().green(),
            };
            println!("{:<width$} | {}", label, count, width = width);
        }
    }
}

/// Renders walk events on the terminal.
///
/// Failures and dry-run previews are always shown. Moves, skips, deletions
/// and unmatched files are only shown when verbose.
pub struct ConsoleReporter {
    verbose: bool,
    spinner: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: OutputFormatter::create_spinner(),
        }
    }

    /// Prints a line without tearing the spinner.
    fn print(&self, print: impl FnOnce()) {
        self.spinner.suspend(print);
    }

    fn render_relocation(&self, kind: RuleKind, key: &str, relocation: &Relocation) {
        let source = relocation.source.display();
        let destination = relocation.destination.display();
        let rule = match kind {
            RuleKind::Tag => format!("tag '{}'", key),
            RuleKind::Extension => format!("ext '{}'", key),
        };
        let dry_run = relocation.options.dry_run;
        let deduplicate = relocation.options.deduplicate;

        match &relocation.outcome {
            Outcome::Moved if dry_run => self.print(|| {
                OutputFormatter::dry_run_notice(&format!(
                    "Would move: {} => {} [{}]",
                    source, destination, rule
                ))
            }),
            Outcome::Moved if self.verbose => self.print(|| {
                OutputFormatter::success(&format!("Moved file: {} => {}", source, destination))
            }),
            Outcome::SkippedExists if relocation.is_already_in_place() => {
                if self.verbose {
                    self.print(|| OutputFormatter::info(&format!("Already in place: {}", destination)))
                }
            }
            Outcome::SkippedExists if dry_run && deduplicate => self.print(|| {
                OutputFormatter::dry_run_notice(&format!(
                    "Would delete duplicate: {} (exists at {})",
                    source, destination
                ))
            }),
            Outcome::SkippedExists if dry_run || self.verbose => {
                self.print(|| OutputFormatter::info(&format!("File exists: {}", destination)))
            }
            Outcome::DeletedDuplicate if self.verbose => self.print(|| {
                OutputFormatter::warning(&format!(
                    "Deleted duplicate: {} (kept {})",
                    source, destination
                ))
            }),
            Outcome::Failed(error) => self.print(|| OutputFormatter::error(&error.to_string())),
            _ => {}
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: WalkEvent) {
        match &event {
            WalkEvent::Unmatched { path } => {
                if self.verbose {
                    self.print(|| OutputFormatter::plain(&format!("No rule for {}", path.display())))
                }
            }
            WalkEvent::ProvisionFailed {
                source,
                destination_dir,
                error,
            } => self.print(|| {
                OutputFormatter::error(&format!(
                    "Failed to prepare {} for {}: {}",
                    destination_dir.display(),
                    source.display(),
                    error
                ))
            }),
            WalkEvent::Relocated {
                kind,
                key,
                relocation,
            } => self.render_relocation(*kind, key, relocation),
            WalkEvent::DirectoryUnreadable { error } => {
                self.print(|| OutputFormatter::error(&error.to_string()))
            }
        }
    }

    fn scanning(&mut self, directory: &Path) {
        self.spinner
            .set_message(format!("Scanning {}", directory.display()));
    }

    fn scan_complete(&mut self, _files: usize) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}

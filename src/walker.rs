//! Recursive traversal of the source tree.
//!
//! The walk runs in two phases. First every regular file under the source
//! directory is listed in depth-first pre-order, with siblings sorted by
//! name. Only then is each file classified and relocated. Directories
//! created while relocating are never visited, which keeps a run
//! deterministic even when the destination lies inside the source tree or
//! is the same directory.
//!
//! Nested source directories are flattened: every match lands directly in
//! `destination/<rule subpath>`, whatever its depth in the source tree.

use crate::classifier::Classifier;
use crate::config::{RuleKind, RuleStore, RunConfig};
use crate::file_organizer::{
    FileOrganizer, OrganizeError, OrganizeResult, Outcome, RelocateOptions, Relocation,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Something worth telling the user about, emitted once per file or
/// skipped directory.
#[derive(Debug)]
pub enum WalkEvent {
    /// No rule matched; the file was left untouched.
    Unmatched { path: PathBuf },
    /// The destination directory for a matched file could not be prepared.
    ProvisionFailed {
        source: PathBuf,
        destination_dir: PathBuf,
        error: OrganizeError,
    },
    /// A matched file went through the relocator.
    Relocated {
        kind: RuleKind,
        /// The tag or extension that matched.
        key: String,
        relocation: Relocation,
    },
    /// A directory could not be read; its contents were skipped.
    DirectoryUnreadable { error: OrganizeError },
}

/// Receives walk events as they happen.
pub trait Reporter {
    fn report(&mut self, event: WalkEvent);

    /// Called for each directory entered while listing the source tree.
    fn scanning(&mut self, _directory: &Path) {}

    /// Called once the source tree has been listed, before any file is touched.
    fn scan_complete(&mut self, _files: usize) {}
}

impl Reporter for Vec<WalkEvent> {
    fn report(&mut self, event: WalkEvent) {
        self.push(event);
    }
}

/// Counts for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    /// Completed renames. This is the operation counter reported at the end
    /// of a run.
    pub moved: usize,
    pub would_move: usize,
    pub skipped_existing: usize,
    pub deleted_duplicates: usize,
    pub would_delete_duplicates: usize,
    pub unmatched: usize,
    pub failed: usize,
    pub unreadable_directories: usize,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            moved: 0,
            would_move: 0,
            skipped_existing: 0,
            deleted_duplicates: 0,
            would_delete_duplicates: 0,
            unmatched: 0,
            failed: 0,
            unreadable_directories: 0,
        }
    }

    fn record(&mut self, relocation: &Relocation) {
        let options = relocation.options;
        match relocation.outcome {
            Outcome::Moved if options.dry_run => self.would_move += 1,
            Outcome::Moved => self.moved += 1,
            Outcome::SkippedExists
                if options.dry_run && options.deduplicate && !relocation.is_already_in_place() =>
            {
                self.would_delete_duplicates += 1
            }
            Outcome::SkippedExists => self.skipped_existing += 1,
            Outcome::DeletedDuplicate => self.deleted_duplicates += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of files that were matched by a rule.
    pub fn matched(&self) -> usize {
        self.moved
            + self.would_move
            + self.skipped_existing
            + self.deleted_duplicates
            + self.would_delete_duplicates
            + self.failed
    }
}

/// Walks one source tree for one run.
pub struct Walker<'a, R: Reporter + ?Sized> {
    config: &'a RunConfig,
    classifier: Classifier<'a>,
    reporter: &'a mut R,
    summary: RunSummary,
    /// Destinations claimed by earlier moves of a dry run.
    planned: HashSet<PathBuf>,
}

impl<'a, R: Reporter + ?Sized> Walker<'a, R> {
    pub fn new(config: &'a RunConfig, rules: &'a RuleStore, reporter: &'a mut R) -> Self {
        Self {
            config,
            classifier: Classifier::new(rules, config.mode),
            reporter,
            summary: RunSummary::new(config.dry_run),
            planned: HashSet::new(),
        }
    }

    /// Lists the source tree, then classifies and relocates every file.
    ///
    /// Per-file and per-directory failures are reported and counted but
    /// never stop the walk.
    pub fn walk(mut self) -> RunSummary {
        let files = self.snapshot();
        self.reporter.scan_complete(files.len());
        log::debug!(
            "Found {} files under {}",
            files.len(),
            self.config.source.display()
        );

        for file in &files {
            self.process_file(file);
        }

        self.summary.finished_at = Some(Utc::now());
        self.summary
    }

    /// Collects every regular file in pre-order before anything is changed.
    fn snapshot(&mut self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let entries = WalkDir::new(&self.config.source)
            .follow_links(true)
            .sort_by_file_name();

        for entry in entries {
            match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        self.reporter.scanning(entry.path());
                    } else if file_type.is_file() {
                        files.push(entry.into_path());
                    } else {
                        log::debug!("Skipping special file {}", entry.path().display());
                    }
                }
                Err(e) => self.handle_walk_error(e),
            }
        }

        files
    }

    fn handle_walk_error(&mut self, error: walkdir::Error) {
        let path = error
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.source.clone());

        if error.loop_ancestor().is_some() {
            log::warn!("Skipping symlink loop at {}", path.display());
            return;
        }

        match path.symlink_metadata() {
            // Broken symlink, nothing to sort.
            Ok(meta) if meta.file_type().is_symlink() && path.metadata().is_err() => {
                log::debug!("Skipping broken symlink {}", path.display());
            }
            // Deleted while the walk was running.
            Err(_) => {
                log::debug!("Skipping vanished entry {}", path.display());
            }
            Ok(_) => {
                log::debug!("Skipping unreadable directory {}: {}", path.display(), error);
                self.summary.unreadable_directories += 1;
                self.reporter.report(WalkEvent::DirectoryUnreadable {
                    error: OrganizeError::DirectoryRead {
                        path,
                        source: error,
                    },
                });
            }
        }
    }

    fn process_file(&mut self, path: &Path) {
        let classification = path
            .file_name()
            .and_then(|name| self.classifier.classify(name));

        let Some(classification) = classification else {
            log::debug!("No rule for {}", path.display());
            self.summary.unmatched += 1;
            self.reporter.report(WalkEvent::Unmatched {
                path: path.to_path_buf(),
            });
            return;
        };

        log::debug!(
            "{} matched {} rule '{}' -> {}",
            path.display(),
            classification.kind.prefix().trim_end_matches(':'),
            classification.key,
            classification.destination
        );

        let destination_dir = self.config.destination.join(classification.destination);
        if let Err(error) = self.provision(&destination_dir) {
            self.summary.failed += 1;
            self.reporter.report(WalkEvent::ProvisionFailed {
                source: path.to_path_buf(),
                destination_dir,
                error,
            });
            return;
        }

        let options = RelocateOptions {
            dry_run: self.config.dry_run,
            deduplicate: self.config.deduplicate,
        };
        let relocation =
            FileOrganizer::relocate_planned(path, &destination_dir, options, &self.planned);
        if options.dry_run && matches!(relocation.outcome, Outcome::Moved) {
            self.planned.insert(relocation.destination.clone());
        }
        self.summary.record(&relocation);
        self.reporter.report(WalkEvent::Relocated {
            kind: classification.kind,
            key: classification.key.to_string(),
            relocation,
        });
    }

    /// A dry run only checks the path; a real run creates the directories.
    fn provision(&self, destination_dir: &Path) -> OrganizeResult<()> {
        if self.config.dry_run {
            FileOrganizer::validate_path_length(destination_dir)
        } else {
            FileOrganizer::ensure_directory(destination_dir).map(|_| ())
        }
    }
}

/// Checks that both run directories exist and are directories.
///
/// # Errors
///
/// Returns `OrganizeError::InvalidSource` or
/// `OrganizeError::InvalidDestination`.
pub fn validate_directories(config: &RunConfig) -> OrganizeResult<()> {
    if !config.source.is_dir() {
        return Err(OrganizeError::InvalidSource {
            path: config.source.clone(),
        });
    }
    if !config.destination.is_dir() {
        return Err(OrganizeError::InvalidDestination {
            path: config.destination.clone(),
        });
    }
    Ok(())
}

/// Validates the run directories, then walks the source tree.
///
/// # Errors
///
/// Fails only if [`validate_directories`] does; nothing is walked then.
pub fn organize<R: Reporter + ?Sized>(
    config: &RunConfig,
    rules: &RuleStore,
    reporter: &mut R,
) -> OrganizeResult<RunSummary> {
    validate_directories(config)?;
    Ok(Walker::new(config, rules, reporter).walk())
}

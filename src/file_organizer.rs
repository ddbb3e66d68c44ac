/// Directory provisioning and file relocation.
///
/// This module creates destination directories on demand and moves files
/// into them. A move is always a same-filesystem rename: there is no
/// copy-then-delete fallback, so a cross-device rename is reported as a
/// failure and the source file stays where it was.
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest path, in bytes, that will be created or moved into.
pub const MAX_PATH_LEN: usize = 4096;

/// Errors that can occur while organizing files.
///
/// Only `InvalidSource` and `InvalidDestination` abort a run; every
/// other variant affects a single file or subtree.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The source path is not an existing directory.
    #[error("Source is not a directory: {}", .path.display())]
    InvalidSource { path: PathBuf },
    /// The destination path is not an existing directory.
    #[error("Destination is not a directory: {}", .path.display())]
    InvalidDestination { path: PathBuf },
    /// A computed path is longer than `MAX_PATH_LEN`.
    #[error("Path is too long ({len} bytes, limit {}): {}", MAX_PATH_LEN, .path.display())]
    PathTooLong { path: PathBuf, len: usize },
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to rename a file into its destination directory.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to delete a duplicate source file.
    #[error("Failed to delete duplicate {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A directory in the source tree could not be read.
    #[error("Failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Flags that change what [`FileOrganizer::relocate`] does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocateOptions {
    /// Decide and report, but do not touch the filesystem.
    pub dry_run: bool,
    /// Delete the source when a same-named file exists at the destination.
    pub deduplicate: bool,
}

/// What happened to a single file.
#[derive(Debug)]
pub enum Outcome {
    /// The file was renamed into place, or would be in a dry run.
    Moved,
    /// A file with the same name already exists at the destination and was
    /// left alone.
    SkippedExists,
    /// The source was deleted because the destination already holds a file
    /// with the same name.
    DeletedDuplicate,
    /// The operation failed; the source file was left in place.
    Failed(OrganizeError),
}

/// A relocation decision for one file.
#[derive(Debug)]
pub struct Relocation {
    pub source: PathBuf,
    /// Full path the file was (or would be) moved to.
    pub destination: PathBuf,
    pub options: RelocateOptions,
    pub outcome: Outcome,
}

impl Relocation {
    /// True for a real, completed rename. Dry-run previews, skips and
    /// deletions never count as moves.
    pub fn is_completed_move(&self) -> bool {
        !self.options.dry_run && matches!(self.outcome, Outcome::Moved)
    }

    /// True when the destination already holds this very file.
    pub fn is_already_in_place(&self) -> bool {
        matches!(self.outcome, Outcome::SkippedExists) && is_same_file(&self.source, &self.destination)
    }
}

/// Creates destination directories and moves files into them.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Checks a path against `MAX_PATH_LEN`.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::PathTooLong` if the path is `MAX_PATH_LEN`
    /// bytes or longer.
    pub fn validate_path_length(path: &Path) -> OrganizeResult<()> {
        let len = path.as_os_str().len();
        if len >= MAX_PATH_LEN {
            return Err(OrganizeError::PathTooLong {
                path: path.to_path_buf(),
                len,
            });
        }
        Ok(())
    }

    /// Ensures every segment of `path` exists as a directory, creating the
    /// missing ones from left to right.
    ///
    /// Calling this again for a path that already exists creates nothing.
    ///
    /// # Returns
    ///
    /// The number of directories that were created.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::PathTooLong` before touching the filesystem if
    /// the path is too long, and `OrganizeError::DirectoryCreate` if a
    /// segment cannot be created (permissions, a file in the way, disk full).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use forg::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let created = FileOrganizer::ensure_directory(Path::new("/srv/sorted/docs/text"))
    ///     .expect("failed to prepare directory");
    /// println!("created {} directories", created);
    /// ```
    pub fn ensure_directory(path: &Path) -> OrganizeResult<usize> {
        Self::validate_path_length(path)?;

        let mut created = 0;
        let mut prefix = PathBuf::new();
        for component in path.components() {
            prefix.push(component);
            if prefix.is_dir() {
                continue;
            }

            match fs::create_dir(&prefix) {
                Ok(()) => {
                    log::debug!("Created directory {}", prefix.display());
                    created += 1;
                }
                // Someone else created it in the meantime.
                Err(_) if prefix.is_dir() => {}
                Err(e) => {
                    return Err(OrganizeError::DirectoryCreate {
                        path: prefix,
                        source: e,
                    });
                }
            }
        }

        Ok(created)
    }

    /// Moves `source_file` into `destination_dir`, keeping its file name.
    ///
    /// When a file with the same name already exists at the destination the
    /// source is either left alone or, with `deduplicate`, deleted. The
    /// destination file is never touched. With `dry_run` the decision is
    /// returned without any change to the filesystem.
    ///
    /// This never fails outright; failures are reported as
    /// [`Outcome::Failed`] so the caller can keep going.
    pub fn relocate(
        source_file: &Path,
        destination_dir: &Path,
        options: RelocateOptions,
    ) -> Relocation {
        Self::relocate_planned(source_file, destination_dir, options, &HashSet::new())
    }

    /// Same as [`FileOrganizer::relocate`], but a dry run also treats every
    /// path in `planned` as occupied. Passing the destinations of earlier
    /// previewed moves makes a dry run report the same collisions a real
    /// run would hit.
    pub fn relocate_planned(
        source_file: &Path,
        destination_dir: &Path,
        options: RelocateOptions,
        planned: &HashSet<PathBuf>,
    ) -> Relocation {
        let Some(file_name) = source_file.file_name() else {
            return Relocation {
                source: source_file.to_path_buf(),
                destination: destination_dir.to_path_buf(),
                options,
                outcome: Outcome::Failed(OrganizeError::Move {
                    from: source_file.to_path_buf(),
                    to: destination_dir.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
                }),
            };
        };

        let destination = destination_dir.join(file_name);
        let outcome = Self::decide(source_file, &destination, options, planned);

        Relocation {
            source: source_file.to_path_buf(),
            destination,
            options,
            outcome,
        }
    }

    fn decide(
        source: &Path,
        destination: &Path,
        options: RelocateOptions,
        planned: &HashSet<PathBuf>,
    ) -> Outcome {
        if let Err(e) = Self::validate_path_length(destination) {
            return Outcome::Failed(e);
        }

        let occupied = fs::symlink_metadata(destination).is_ok()
            || (options.dry_run && planned.contains(destination));
        if occupied {
            if is_same_file(source, destination) {
                log::debug!("{} is already in place", source.display());
                return Outcome::SkippedExists;
            }
            if options.dry_run || !options.deduplicate {
                return Outcome::SkippedExists;
            }
            return match fs::remove_file(source) {
                Ok(()) => {
                    log::debug!(
                        "Deleted {} (duplicate of {})",
                        source.display(),
                        destination.display()
                    );
                    Outcome::DeletedDuplicate
                }
                Err(e) => Outcome::Failed(OrganizeError::Delete {
                    path: source.to_path_buf(),
                    source: e,
                }),
            };
        }

        if options.dry_run {
            return Outcome::Moved;
        }

        match fs::rename(source, destination) {
            Ok(()) => {
                log::debug!("Moved {} to {}", source.display(), destination.display());
                Outcome::Moved
            }
            Err(e) => Outcome::Failed(OrganizeError::Move {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            }),
        }
    }
}

/// Compares two paths after resolving symlinks and relative segments.
fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

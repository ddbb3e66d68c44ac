//! forg - a simple file organizer
//!
//! This library walks a source directory tree and moves each file into a
//! destination folder chosen by a rule: either the tag at the start of its
//! name (the text before the first `-`) or its extension. Rules come from a
//! plain-text rules file. Runs can be previewed with a dry run, and files
//! that already exist at their destination can be deleted from the source.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod output;
pub mod walker;

pub use classifier::{Classification, Classifier, Mode};
pub use config::{ConfigError, Rule, RuleKind, RuleStore, RunConfig};
pub use file_organizer::{FileOrganizer, OrganizeError, Outcome, RelocateOptions, Relocation};
pub use walker::{Reporter, RunSummary, WalkEvent, Walker, organize};

pub use cli::{Args, run_cli};

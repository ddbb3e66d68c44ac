//! Command-line interface module for forg.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and shell completion scripts
//! - Confirmation when source and destination are the same directory
//! - Loading the rules file
//! - Running the walk and rendering its events

use crate::classifier::Mode;
use crate::config::{RuleStore, RunConfig, resolve_config_path};
use crate::output::{ConsoleReporter, OutputFormatter};
use crate::walker::{self, RunSummary};
use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sort files into folders by filename tag or extension.
///
/// Rules are read from ~/.local/share/forg.conf unless --config is given.
#[derive(Parser, Debug, Default)]
#[command(name = "forg", author, long_about = None)]
pub struct Args {
    /// Directory to take files from (searched recursively)
    #[arg(value_name = "SRC", required_unless_present = "completions")]
    pub source: Option<PathBuf>,

    /// Directory to sort files into
    #[arg(value_name = "DEST", required_unless_present = "completions")]
    pub destination: Option<PathBuf>,

    /// Which rules to apply: tag, ext, or auto (tag first, then extension)
    #[arg(value_enum, default_value_t = Mode::Auto)]
    pub mode: Mode,

    /// Preview actions
    #[arg(short, long)]
    pub dry: bool,

    /// Remove duplicate files
    #[arg(short = 'r', long = "rm")]
    pub remove: bool,

    /// Enable verbosity
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Rules file to use instead of ~/.local/share/forg.conf
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not ask for confirmation when source and destination are the same
    #[arg(short, long)]
    pub yes: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Print a completion script for SHELL and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    pub completions: Option<Shell>,
}

impl Args {
    /// Builds the settings for one run from the parsed arguments.
    ///
    /// # Errors
    ///
    /// Fails when the source or destination directory was not given.
    pub fn run_config(&self) -> Result<RunConfig> {
        let source = self.source.clone().context("Missing source directory")?;
        let destination = self
            .destination
            .clone()
            .context("Missing destination directory")?;
        Ok(RunConfig {
            source,
            destination,
            mode: self.mode,
            dry_run: self.dry,
            deduplicate: self.remove,
            verbose: self.verbose,
        })
    }
}

/// Writes the completion script for `shell` to `out`.
pub fn print_completions(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Args::command(), "forg", out);
}

/// Runs forg with already parsed arguments.
///
/// # Errors
///
/// Fails when a run directory is missing or invalid, the rules file cannot be read, or
/// the user declines to continue with identical source and destination.
/// Failures of individual files are reported on the terminal and counted in
/// the returned summary instead.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use forg::cli::{Args, run_cli};
///
/// let args = Args::parse_from(["forg", "--dry", "/home/me/Downloads", "/home/me/Sorted"]);
/// match run_cli(&args) {
///     Ok(summary) => println!("{} files moved", summary.moved),
///     Err(e) => eprintln!("Error: {:#}", e),
/// }
/// ```
pub fn run_cli(args: &Args) -> Result<RunSummary> {
    let config = args.run_config()?;

    walker::validate_directories(&config)?;

    if is_same_directory(&config.source, &config.destination) && !args.yes {
        confirm_same_directory()?;
    }

    let config_path = resolve_config_path(args.config.as_deref())?;
    let rules = RuleStore::load(&config_path)
        .with_context(|| format!("Error loading rules from {}", config_path.display()))?;

    if config.verbose {
        OutputFormatter::info(&format!("Using {} mode", config.mode));
        OutputFormatter::plain(&format!(
            "Loaded {} tag rules and {} extension rules",
            rules.tag_rules().len(),
            rules.extension_rules().len()
        ));
        if rules.is_empty() {
            OutputFormatter::warning(&format!("No rules found in {}", config_path.display()));
        }
    }
    if config.dry_run {
        OutputFormatter::dry_run_notice("Dry run mode enabled.");
    }

    let summary = {
        let mut reporter = ConsoleReporter::new(config.verbose);
        walker::organize(&config, &rules, &mut reporter)?
    };

    if config.verbose {
        OutputFormatter::summary_table(&summary);
    }
    OutputFormatter::plain(&format!("{} operations finished.", summary.moved));

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
    }

    Ok(summary)
}

/// Compares the resolved paths, so `dir` and `dir/.` count as the same.
fn is_same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn confirm_same_directory() -> Result<()> {
    OutputFormatter::warning("source and destination are the same!");
    OutputFormatter::plain("This may cause issues or slow performance.");

    let proceed = dialoguer::Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()
        .context("Could not read confirmation (use --yes to skip it)")?;

    if !proceed {
        bail!("Aborting.");
    }
    Ok(())
}

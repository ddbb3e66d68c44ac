//! Sorting rules and per-run settings.
//!
//! Rules are read from a plain-text file, one rule per line:
//!
//! ```text
//! # comment
//! ext:<extension>=<relative/destination/path>
//! tag:<tag>=<relative/destination/path>
//! ```
//!
//! Comment lines, lines shorter than three characters, lines with an unknown
//! prefix and rules with an empty key or destination are ignored. Keys and
//! destinations are taken exactly as typed; nothing is trimmed apart from the
//! line terminator.

use crate::classifier::Mode;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Location of the rules file relative to the user's home directory.
pub const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".local/share/forg.conf";

/// Errors that can occur while loading the rules file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Rules file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Rules file exists but could not be read.
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No explicit rules file was given and the home directory is unknown.
    #[error("Could not determine the home directory to locate the configuration file")]
    NoHomeDirectory,
}

/// Which collection a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Keyed by the filename text before the first `-`.
    Tag,
    /// Keyed by the filename text after the last `.`.
    Extension,
}

impl RuleKind {
    /// The prefix used for this kind of rule in the rules file.
    pub fn prefix(&self) -> &'static str {
        match self {
            RuleKind::Tag => "tag:",
            RuleKind::Extension => "ext:",
        }
    }
}

/// A single mapping from a tag or extension to a destination subpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub key: String,
    pub destination: String,
}

/// Extension and tag rules, kept in the order they were loaded.
///
/// Lookups are exact and case-sensitive. When a key appears more than once
/// the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    extension_rules: Vec<Rule>,
    tag_rules: Vec<Rule>,
}

impl RuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses the rules file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist and
    /// `ConfigError::Read` if it cannot be opened or read.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let store = Self::parse(&content);
        log::debug!(
            "Loaded {} tag rules and {} extension rules from {}",
            store.tag_rules.len(),
            store.extension_rules.len(),
            path.display()
        );
        Ok(store)
    }

    /// Parses rules from the text of a rules file. Never fails; lines that
    /// are not well-formed rules are skipped.
    pub fn parse(content: &str) -> Self {
        let mut store = Self::new();

        for (index, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.len() < 3 {
                continue;
            }

            let (kind, body) = if let Some(body) = line.strip_prefix(RuleKind::Extension.prefix()) {
                (RuleKind::Extension, body)
            } else if let Some(body) = line.strip_prefix(RuleKind::Tag.prefix()) {
                (RuleKind::Tag, body)
            } else {
                continue;
            };

            let Some((key, destination)) = body.split_once('=') else {
                continue;
            };
            if key.is_empty() || destination.is_empty() {
                continue;
            }
            if !is_relative_subpath(destination) {
                log::warn!(
                    "Ignoring rule on line {}: destination '{}' must be a relative path without '..'",
                    index + 1,
                    destination
                );
                continue;
            }

            store.add_rule(kind, key, destination);
        }

        store
    }

    /// Appends a rule. Earlier rules with the same key keep precedence.
    pub fn add_rule(&mut self, kind: RuleKind, key: &str, destination: &str) {
        let rule = Rule {
            key: key.to_string(),
            destination: destination.to_string(),
        };
        match kind {
            RuleKind::Extension => self.extension_rules.push(rule),
            RuleKind::Tag => self.tag_rules.push(rule),
        }
    }

    /// Destination for an extension (without the leading dot).
    pub fn lookup_extension(&self, extension: &str) -> Option<&str> {
        Self::lookup(&self.extension_rules, extension)
    }

    /// Destination for a tag.
    pub fn lookup_tag(&self, tag: &str) -> Option<&str> {
        Self::lookup(&self.tag_rules, tag)
    }

    fn lookup<'a>(rules: &'a [Rule], key: &str) -> Option<&'a str> {
        rules
            .iter()
            .find(|rule| rule.key == key)
            .map(|rule| rule.destination.as_str())
    }

    pub fn extension_rules(&self) -> &[Rule] {
        &self.extension_rules
    }

    pub fn tag_rules(&self) -> &[Rule] {
        &self.tag_rules
    }

    /// Total number of rules of both kinds.
    pub fn len(&self) -> usize {
        self.extension_rules.len() + self.tag_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rule destinations must stay inside the destination root.
fn is_relative_subpath(destination: &str) -> bool {
    let path = Path::new(destination);
    !path.has_root()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Resolves the rules file: the explicit path if one was given, otherwise
/// `~/.local/share/forg.conf`.
///
/// # Errors
///
/// Returns `ConfigError::NoHomeDirectory` when no path was given and the
/// home directory cannot be determined.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_RELATIVE_PATH))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Settings for a single invocation. Built once by the caller and never
/// modified by the walk.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory tree to sort.
    pub source: PathBuf,
    /// Root under which rule destinations are created.
    pub destination: PathBuf,
    pub mode: Mode,
    /// Report intended actions without touching the filesystem.
    pub dry_run: bool,
    /// Delete the source file when a same-named file already sits at the destination.
    pub deduplicate: bool,
    /// Only affects how much the caller renders.
    pub verbose: bool,
}

impl RunConfig {
    /// Creates a run in auto mode with every flag off.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode: Mode::default(),
            dry_run: false,
            deduplicate: false,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_extension_and_tag_rules() {
        let store = RuleStore::parse("ext:txt=docs/text\ntag:invoice=finance/bills\n");

        assert_eq!(store.lookup_extension("txt"), Some("docs/text"));
        assert_eq!(store.lookup_tag("invoice"), Some("finance/bills"));
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.tag_rules(),
            &[Rule {
                key: "invoice".to_string(),
                destination: "finance/bills".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_skips_comments_and_short_lines() {
        let store = RuleStore::parse("# ext:txt=docs\n\nab\next:md=notes\n");

        assert_eq!(store.lookup_extension("txt"), None);
        assert_eq!(store.lookup_extension("md"), Some("notes"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_parse_skips_malformed_rules() {
        let store = RuleStore::parse("ext:txt\next:=docs\ntag:work=\nfoo:bar=baz\nrandom text\n");
        assert!(store.is_empty());
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let store = RuleStore::parse("tag:a=b=c\n");
        assert_eq!(store.lookup_tag("a"), Some("b=c"));
    }

    #[test]
    fn test_parse_preserves_whitespace() {
        let store = RuleStore::parse("ext: txt=docs \n");

        assert_eq!(store.lookup_extension("txt"), None);
        assert_eq!(store.lookup_extension(" txt"), Some("docs "));
    }

    #[test]
    fn test_parse_handles_crlf_line_endings() {
        let store = RuleStore::parse("ext:txt=docs\r\ntag:work=jobs\r\n");

        assert_eq!(store.lookup_extension("txt"), Some("docs"));
        assert_eq!(store.lookup_tag("work"), Some("jobs"));
    }

    #[test]
    fn test_first_match_wins() {
        let store = RuleStore::parse("ext:txt=first\next:txt=second\n");

        assert_eq!(store.lookup_extension("txt"), Some("first"));
        assert_eq!(store.extension_rules().len(), 2);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let store = RuleStore::parse("ext:txt=docs\n");
        assert_eq!(store.lookup_extension("TXT"), None);
    }

    #[test]
    fn test_tag_and_extension_collections_are_disjoint() {
        let store = RuleStore::parse("ext:pdf=docs\n");
        assert_eq!(store.lookup_tag("pdf"), None);
    }

    #[test]
    fn test_parse_rejects_escaping_destinations() {
        let store = RuleStore::parse("ext:txt=/etc\next:md=../outside\next:rs=code/../../x\next:ok=./fine\n");

        assert_eq!(store.lookup_extension("txt"), None);
        assert_eq!(store.lookup_extension("md"), None);
        assert_eq!(store.lookup_extension("rs"), None);
        assert_eq!(store.lookup_extension("ok"), Some("./fine"));
    }

    #[test]
    fn test_parse_many_rules() {
        let content: String = (0..2000).map(|i| format!("ext:e{}=d{}\n", i, i)).collect();
        let store = RuleStore::parse(&content);

        assert_eq!(store.len(), 2000);
        assert_eq!(store.lookup_extension("e1999"), Some("d1999"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = RuleStore::load(&temp_dir.path().join("missing.conf"));

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("forg.conf");
        fs::write(&path, "ext:jpg=pictures\n").expect("Failed to write config");

        let store = RuleStore::load(&path).expect("Failed to load config");
        assert_eq!(store.lookup_extension("jpg"), Some("pictures"));
    }

    #[test]
    fn test_resolve_config_path_prefers_explicit() {
        let path = resolve_config_path(Some(Path::new("/tmp/rules.conf"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/rules.conf"));
    }

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::new("/src", "/dest");

        assert_eq!(config.mode, Mode::Auto);
        assert!(!config.dry_run);
        assert!(!config.deduplicate);
        assert!(!config.verbose);
    }
}

//! Filename classification against the loaded rules.
//!
//! A filename can carry two classification keys: a tag (the text before
//! the first `-`) and an extension (the text after the last `.`). The active
//! [`Mode`] decides which of them are consulted.
//!
//! Keys are cut from the raw bytes of the name, so a name that is not valid
//! UTF-8 still matches as long as the tag or extension itself is.
//!
//! # Examples
//!
//! ```
//! use forg::classifier::{Classifier, Mode};
//! use forg::config::RuleStore;
//!
//! let rules = RuleStore::parse("ext:txt=docs/text\ntag:invoice=finance/bills\n");
//! let classifier = Classifier::new(&rules, Mode::Auto);
//!
//! assert_eq!(classifier.destination("invoice-2024.txt"), Some("finance/bills"));
//! assert_eq!(classifier.destination("report.txt"), Some("docs/text"));
//! assert_eq!(classifier.destination("notes.md"), None);
//! ```
use crate::config::{RuleKind, RuleStore};
use std::ffi::OsStr;
use std::fmt;
use std::str;

/// Which classification keys are consulted for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// Tag first, extension as fallback.
    #[default]
    Auto,
    /// Tag rules only.
    Tag,
    /// Extension rules only.
    Ext,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Tag => "tag",
            Mode::Ext => "ext",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the text before the first `-`, or `None` if there is no `-` or
/// the tag is not valid UTF-8.
///
/// ```
/// use forg::classifier::extract_tag;
///
/// assert_eq!(extract_tag("journal-botany.pdf"), Some("journal"));
/// assert_eq!(extract_tag("botany.pdf"), None);
/// ```
pub fn extract_tag<S: AsRef<OsStr> + ?Sized>(filename: &S) -> Option<&str> {
    let bytes = filename.as_ref().as_encoded_bytes();
    let index = bytes.iter().position(|&b| b == b'-')?;
    str::from_utf8(&bytes[..index]).ok()
}

/// Returns the text after the last `.`.
///
/// There is no extension when the name has no `.`, when the only `.` starts
/// the name (`.bashrc`), when nothing follows the last `.` (`draft.`), or
/// when the extension is not valid UTF-8.
///
/// ```
/// use forg::classifier::extract_extension;
///
/// assert_eq!(extract_extension("archive.tar.gz"), Some("gz"));
/// assert_eq!(extract_extension("Makefile"), None);
/// assert_eq!(extract_extension(".bashrc"), None);
/// ```
pub fn extract_extension<S: AsRef<OsStr> + ?Sized>(filename: &S) -> Option<&str> {
    let bytes = filename.as_ref().as_encoded_bytes();
    match bytes.iter().rposition(|&b| b == b'.') {
        Some(0) | None => None,
        Some(index) if index + 1 == bytes.len() => None,
        Some(index) => str::from_utf8(&bytes[index + 1..]).ok(),
    }
}

/// The rule a filename matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub kind: RuleKind,
    /// The tag or extension that matched.
    pub key: &'a str,
    /// Destination subpath, relative to the destination root.
    pub destination: &'a str,
}

/// Resolves filenames to destination subpaths for one mode.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    rules: &'r RuleStore,
    mode: Mode,
}

impl<'r> Classifier<'r> {
    pub fn new(rules: &'r RuleStore, mode: Mode) -> Self {
        Self { rules, mode }
    }

    /// Classifies a filename. In auto mode a matching tag always wins over a
    /// matching extension.
    pub fn classify<'a, S>(&self, filename: &'a S) -> Option<Classification<'a>>
    where
        'r: 'a,
        S: AsRef<OsStr> + ?Sized,
    {
        let filename = filename.as_ref();
        match self.mode {
            Mode::Tag => self.by_tag(filename),
            Mode::Ext => self.by_extension(filename),
            Mode::Auto => self
                .by_tag(filename)
                .or_else(|| self.by_extension(filename)),
        }
    }

    /// Shorthand for the destination subpath of [`Classifier::classify`].
    pub fn destination<'a, S>(&self, filename: &'a S) -> Option<&'a str>
    where
        'r: 'a,
        S: AsRef<OsStr> + ?Sized,
    {
        self.classify(filename).map(|c| c.destination)
    }

    fn by_tag<'a>(&self, filename: &'a OsStr) -> Option<Classification<'a>>
    where
        'r: 'a,
    {
        let tag = extract_tag(filename)?;
        self.rules.lookup_tag(tag).map(|destination| Classification {
            kind: RuleKind::Tag,
            key: tag,
            destination,
        })
    }

    fn by_extension<'a>(&self, filename: &'a OsStr) -> Option<Classification<'a>>
    where
        'r: 'a,
    {
        let extension = extract_extension(filename)?;
        self.rules
            .lookup_extension(extension)
            .map(|destination| Classification {
                kind: RuleKind::Extension,
                key: extension,
                destination,
            })
    }
}

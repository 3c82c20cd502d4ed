//! Identifier cleaning for generated cellrange names.
//!
//! Excel names only accept a restricted alphabet, so variable names, subscript
//! labels and series names are reduced to `[A-Za-z0-9_]` before being used as
//! range names. The raw labels are still used inside Vensim subscript brackets.

use crate::error::{E2vError, E2vResult};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

fn invalid_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("static regex"))
}

/// Replace every run of characters outside `[A-Za-z0-9]` by one underscore and
/// trim leading and trailing underscores.
pub fn clean_identifier(name: &str) -> String {
    invalid_run()
        .replace_all(name, "_")
        .trim_matches('_')
        .to_string()
}

/// Which user-supplied name was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Variable,
    Subscript,
    Series,
}

impl IdentifierKind {
    fn describe(self) -> &'static str {
        match self {
            IdentifierKind::Variable => "variable",
            IdentifierKind::Subscript => "subscript",
            IdentifierKind::Series => "interpolation dimension",
        }
    }
}

/// A user-supplied name that had to be cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeWarning {
    pub kind: IdentifierKind,
    pub original: String,
    pub cleaned: String,
}

impl fmt::Display for SanitizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The name of the {} '{}' has special characters. '{}' will be used for cellrange names.",
            self.kind.describe(),
            self.original,
            self.cleaned
        )
    }
}

/// Cleans identifiers and remembers which originals have already been reported.
///
/// One instance lives for a whole run, so a bad label shared by several
/// variables or dimensions is reported a single time.
#[derive(Debug, Default)]
pub struct Identifiers {
    reported: HashSet<String>,
    warnings: Vec<SanitizeWarning>,
    unannounced: usize,
}

impl Identifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean `raw`, recording a warning the first time a given original changes.
    ///
    /// # Errors
    /// Returns a configuration error when nothing usable is left after cleaning.
    pub fn clean(&mut self, raw: &str, kind: IdentifierKind) -> E2vResult<String> {
        let original = raw.trim();
        let cleaned = clean_identifier(original);

        if cleaned.is_empty() {
            return Err(E2vError::config(format!(
                "the {} name '{}' has no characters usable in a cellrange name",
                kind.describe(),
                original
            )));
        }

        if cleaned != original && self.reported.insert(original.to_string()) {
            self.warnings.push(SanitizeWarning {
                kind,
                original: original.to_string(),
                cleaned: cleaned.clone(),
            });
        }

        Ok(cleaned)
    }

    /// Every warning recorded so far, in first-seen order.
    pub fn warnings(&self) -> &[SanitizeWarning] {
        &self.warnings
    }

    /// Warnings recorded since the previous call.
    pub fn drain_new(&mut self) -> &[SanitizeWarning] {
        let start = self.unannounced;
        self.unannounced = self.warnings.len();
        &self.warnings[start..]
    }
}

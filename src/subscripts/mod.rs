//! Subscript ranges available to the variables of a run.
//!
//! The registry is a flat map from subscript range name to its ordered
//! members. It can be read from a JSON file or derived from the subscript
//! range definitions of a Vensim `.mdl` model.

mod mdl;

pub use mdl::parse_mdl_subscripts;

use crate::error::{E2vError, E2vResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptRegistry {
    ranges: BTreeMap<String, Vec<String>>,
}

impl SubscriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, members)` pairs, trimming whitespace.
    pub fn from_ranges<I, K, V, S>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        registry.update(ranges);
        registry
    }

    /// Parse a JSON object mapping range names to member lists.
    pub fn from_json_str(json: &str) -> E2vResult<Self> {
        let ranges: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self::from_ranges(ranges))
    }

    /// Read the subscripts from a `.json` or `.mdl` file.
    pub fn load(path: &Path) -> E2vResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let registry = match extension.as_deref() {
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?)?,
            Some("mdl") => parse_mdl_subscripts(&std::fs::read_to_string(path)?)?,
            _ => {
                return Err(E2vError::config(format!(
                    "the subscript file '{}' must be a Vensim model (.mdl) or JSON (.json) file",
                    path.display()
                )))
            }
        };

        debug!(
            "loaded {} subscript ranges from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Add or replace ranges, trimming names and members.
    pub fn update<I, K, V, S>(&mut self, ranges: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (name, members) in ranges {
            self.ranges.insert(
                name.as_ref().trim().to_string(),
                members
                    .into_iter()
                    .map(|m| m.as_ref().trim().to_string())
                    .collect(),
            );
        }
    }

    /// Members of a subscript range.
    ///
    /// # Errors
    /// Returns [`E2vError::UnknownSubscriptRange`] listing the known ranges.
    pub fn get(&self, name: &str) -> E2vResult<&[String]> {
        self.ranges
            .get(name.trim())
            .map(Vec::as_slice)
            .ok_or_else(|| E2vError::UnknownSubscriptRange {
                name: name.trim().to_string(),
                available: self.names(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(name.trim())
    }

    pub fn names(&self) -> Vec<String> {
        self.ranges.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.ranges.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Serialize as the JSON accepted by [`SubscriptRegistry::from_json_str`].
    pub fn to_json_pretty(&self) -> E2vResult<String> {
        Ok(serde_json::to_string_pretty(&self.ranges)?)
    }
}

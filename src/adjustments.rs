//! Manual per-title citation corrections.
//!
//! A named exception table mapping an exact (title-cased) title to a signed
//! delta applied to the source's citation count. The built-in table can be
//! extended from a JSON object file: `{"<title>": <delta>, ...}`.

use crate::error::{Result, ScholarFeedError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Built-in corrections
const BUILTIN: &[(&str, i64)] = &[(
    "Data Privacy Preservation With Federated Learning: A Systematic Review",
    1,
)];

/// Title → citation delta table
#[derive(Debug, Clone, PartialEq)]
pub struct CitationAdjustments {
    table: BTreeMap<String, i64>,
}

impl CitationAdjustments {
    /// Table with no corrections at all
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Add or replace the correction for `title`
    pub fn insert(&mut self, title: impl Into<String>, delta: i64) {
        self.table.insert(title.into(), delta);
    }

    /// Merge entries from a JSON file over the current table
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let extra: BTreeMap<String, i64> = serde_json::from_str(&content).map_err(|e| {
            ScholarFeedError::Config(format!("Invalid adjustment file {:?}: {}", path, e))
        })?;
        info!(count = extra.len(), path = ?path, "Loaded citation adjustments");
        self.table.extend(extra);
        Ok(())
    }

    /// Delta for `title`, zero when absent
    pub fn delta_for(&self, title: &str) -> i64 {
        self.table.get(title).copied().unwrap_or(0)
    }

    /// Apply the correction for `title` to `raw`; the result never goes below zero.
    pub fn apply(&self, title: &str, raw: u64) -> u64 {
        raw.saturating_add_signed(self.delta_for(title))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for CitationAdjustments {
    fn default() -> Self {
        let mut adjustments = Self::empty();
        for (title, delta) in BUILTIN {
            adjustments.insert(*title, *delta);
        }
        adjustments
    }
}

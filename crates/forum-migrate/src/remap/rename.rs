//! Original-to-final value maps for renamed usernames and emails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Row, Value};

/// Persisted map of values changed by collision resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameMap {
    entries: BTreeMap<String, String>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` was stored as `renamed`.
    pub fn record(&mut self, original: impl Into<String>, renamed: impl Into<String>) {
        self.entries.insert(original.into(), renamed.into());
    }

    /// Final value for `original`, if it was renamed.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// `original` mapped through the renames.
    pub fn apply<'a>(&'a self, original: &'a str) -> &'a str {
        self.get(original).unwrap_or(original)
    }

    /// Rewrite text columns of `row` in place.
    pub fn rewrite(&self, row: &mut Row, columns: &[&str]) {
        if self.entries.is_empty() {
            return;
        }
        for column in columns {
            let renamed = match row.get(column) {
                Some(Value::Text(value)) => self.get(value).map(str::to_string),
                _ => None,
            };
            if let Some(renamed) = renamed {
                row.set(column, renamed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

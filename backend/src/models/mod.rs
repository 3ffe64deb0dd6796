//! Domain models for LDIF flattening.
//!
//! - [`DnComponents`] - DN attribute groups in the order they appeared
//! - [`FlatRecord`] - one directory entry as an ordered column → value map
//! - [`SuffixPolicy`] - how repeated attribute keys get their numeric suffix

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SuffixPolicy
// =============================================================================

/// Strategy used to pick the occurrence index of a repeated attribute key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuffixPolicy {
    /// Count previous occurrences of exactly this key.
    #[default]
    ExactKey,
    /// Count every existing column whose name starts with the key.
    ///
    /// Reproduces the historical output, where `c` after `cn1`, `cn2` becomes `c3`.
    LegacyPrefix,
}

impl FromStr for SuffixPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" | "exact-key" => Ok(Self::ExactKey),
            "legacy" | "prefix" | "legacy-prefix" => Ok(Self::LegacyPrefix),
            other => Err(format!("Unknown suffix policy: {}", other)),
        }
    }
}

impl fmt::Display for SuffixPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactKey => write!(f, "exact-key"),
            Self::LegacyPrefix => write!(f, "legacy-prefix"),
        }
    }
}

// =============================================================================
// DnComponents
// =============================================================================

/// Attribute groups of one distinguished name.
///
/// Keys keep first-appearance order; each key keeps its values in DN order,
/// so `cn=John,cn=Jack` yields `cn → ["John", "Jack"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnComponents {
    groups: Vec<(String, Vec<String>)>,
}

impl DnComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the group of `key`, creating the group if needed.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.groups.push((key, vec![value])),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Flatten into a new record with columns `key1..keyN` per group.
    pub fn flatten(&self) -> FlatRecord {
        let mut record = FlatRecord::new();
        for (key, values) in self.iter() {
            for value in values {
                record.push_attribute(key, value, SuffixPolicy::ExactKey);
            }
        }
        record
    }
}

// =============================================================================
// FlatRecord
// =============================================================================

/// One directory entry as a single-level, insertion-ordered column map.
///
/// Columns are never overwritten: [`FlatRecord::push_attribute`] always
/// synthesizes a fresh `<key><n>` name.
#[derive(Debug, Clone, Default)]
pub struct FlatRecord {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    /// Last index handed out per exact key.
    counters: HashMap<String, usize>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `key` and return the column name it was stored under.
    pub fn push_attribute(&mut self, key: &str, value: &str, policy: SuffixPolicy) -> String {
        let mut n = match policy {
            SuffixPolicy::ExactKey => self.counters.get(key).copied().unwrap_or(0) + 1,
            SuffixPolicy::LegacyPrefix => {
                self.entries
                    .iter()
                    .filter(|(column, _)| column.starts_with(key))
                    .count()
                    + 1
            }
        };

        let mut column = format!("{}{}", key, n);
        // `a` + 11 and `a1` + 1 both spell `a11`
        while self.index.contains_key(&column) {
            n += 1;
            column = format!("{}{}", key, n);
        }

        let counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter = (*counter).max(n);

        self.index.insert(column.clone(), self.entries.len());
        self.entries.push((column.clone(), value.to_string()));
        column
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.index
            .get(column)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Value of `column`, or `default` when the record lacks it.
    pub fn get_or<'a>(&'a self, column: &str, default: &'a str) -> &'a str {
        self.get(column).unwrap_or(default)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

impl PartialEq for FlatRecord {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for FlatRecord {}

impl<'a> FromIterator<(&'a str, &'a str)> for FlatRecord {
    /// Builds a record with the given column names as-is (no suffixing).
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut record = FlatRecord::new();
        for (column, value) in iter {
            if record.contains(column) {
                continue;
            }
            record.index.insert(column.to_string(), record.entries.len());
            record.entries.push((column.to_string(), value.to_string()));
        }
        record
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

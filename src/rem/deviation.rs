//! Deviation records grouped by condition and form factor.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Composite key naming one deviation group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub condition: String,
    pub form_factor: String,
}

impl GroupKey {
    pub fn new(condition: impl Into<String>, form_factor: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            form_factor: form_factor.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.condition, self.form_factor)
    }
}

/// A measured row extended with its signed per-ear differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    pub subject: String,
    pub condition: String,
    pub form_factor: String,
    pub freq: u32,
    pub left: f64,
    pub right: f64,
    pub left_diff: f64,
    pub right_diff: f64,
}

/// Deviation records grouped under [`GroupKey`]s in deterministic order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviationSet {
    groups: BTreeMap<GroupKey, Vec<DeviationRecord>>,
}

impl DeviationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: GroupKey, records: Vec<DeviationRecord>) {
        self.groups.insert(key, records);
    }

    /// Records for one group.
    pub fn get(&self, key: &GroupKey) -> Option<&[DeviationRecord]> {
        self.groups.get(key).map(|v| v.as_slice())
    }

    /// Group keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    /// Iterate groups in order.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[DeviationRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Iterate all records across groups, flat.
    pub fn records(&self) -> impl Iterator<Item = &DeviationRecord> {
        self.groups.values().flatten()
    }

    /// Number of groups.
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of records across all groups.
    pub fn n_records(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Check if no group holds any record.
    pub fn is_empty(&self) -> bool {
        self.n_records() == 0
    }

    /// Write all groups to one flat CSV, group order preserved.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in self.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

//! Incomplete-dataset detection and removal.
//!
//! A cell is the set of trials sharing one (subject, comparison, snr,
//! condition) key within a trial-type partition. Each subject was presented
//! every cell a fixed number of times; a cell with any other trial count is
//! unusable for the within-subject statistics downstream and is dropped
//! wholesale, never trimmed.

use crate::data::{Observation, TrialType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Repeated presentations per subject/comparison/SNR/condition cell.
pub const EXPECTED_TRIALS: usize = 4;

/// Statistics from a completeness-filter pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessStats {
    /// Trials before filtering.
    pub rows_before: usize,
    /// Trials after filtering.
    pub rows_after: usize,
    /// Occupied cells across both trial-type partitions.
    pub groups_seen: usize,
    /// Cells dropped for having an unexpected trial count.
    pub groups_dropped: usize,
}

impl std::fmt::Display for CompletenessStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Completeness Filter")?;
        writeln!(f, "  Before:  {} trials", self.rows_before)?;
        writeln!(f, "  After:   {} trials", self.rows_after)?;
        writeln!(f, "  Cells:   {} seen", self.groups_seen)?;
        writeln!(f, "  Dropped: {} cells", self.groups_dropped)?;
        Ok(())
    }
}

/// Remove all incomplete cells, expecting [`EXPECTED_TRIALS`] trials each.
pub fn remove_incomplete(records: &[Observation]) -> Vec<Observation> {
    remove_incomplete_with(records, EXPECTED_TRIALS)
}

/// Remove all incomplete cells with a caller-provided expected count.
pub fn remove_incomplete_with(records: &[Observation], expected_count: usize) -> Vec<Observation> {
    remove_incomplete_with_stats(records, expected_count).0
}

/// Remove all incomplete cells and report what was dropped.
///
/// The preference and noise partitions are filtered independently (the
/// expected count is only meaningful within a homogeneous trial type) and
/// concatenated preference-first, matching the layout of the written report.
pub fn remove_incomplete_with_stats(
    records: &[Observation],
    expected_count: usize,
) -> (Vec<Observation>, CompletenessStats) {
    let prefs: Vec<&Observation> = records
        .iter()
        .filter(|r| r.trial_type == TrialType::Pref)
        .collect();
    let noise: Vec<&Observation> = records
        .iter()
        .filter(|r| r.trial_type == TrialType::Noise)
        .collect();

    let mut stats = CompletenessStats {
        rows_before: records.len(),
        rows_after: 0,
        groups_seen: 0,
        groups_dropped: 0,
    };

    let mut kept = filter_partition(&prefs, expected_count, &mut stats);
    kept.extend(filter_partition(&noise, expected_count, &mut stats));
    stats.rows_after = kept.len();

    info!(
        "completeness filter kept {} of {} trials ({} of {} cells dropped)",
        stats.rows_after, stats.rows_before, stats.groups_dropped, stats.groups_seen
    );
    (kept, stats)
}

type CellKey<'a> = (&'a str, &'a str, &'a str, &'a str);

/// Filter one trial-type partition.
///
/// Iterates the full Cartesian product of the observed distinct values of
/// each key field, not just the combinations that occur. A combination with
/// no trials is expected in sparse designs and is skipped; a combination
/// with trials present keeps them only when the count matches exactly.
fn filter_partition(
    records: &[&Observation],
    expected_count: usize,
    stats: &mut CompletenessStats,
) -> Vec<Observation> {
    let subjects = distinct(records, |r| r.subject.as_str());
    let comparisons = distinct(records, |r| r.comparison.as_str());
    let snrs = distinct(records, |r| r.snr.as_str());
    let conditions = distinct(records, |r| r.condition.as_str());

    let mut cells: HashMap<CellKey<'_>, Vec<usize>> = HashMap::new();
    for (idx, r) in records.iter().enumerate() {
        cells
            .entry((
                r.subject.as_str(),
                r.comparison.as_str(),
                r.snr.as_str(),
                r.condition.as_str(),
            ))
            .or_default()
            .push(idx);
    }
    stats.groups_seen += cells.len();

    let mut keep = vec![true; records.len()];
    for &subject in &subjects {
        for &comparison in &comparisons {
            for &snr in &snrs {
                for &condition in &conditions {
                    let Some(rows) = cells.get(&(subject, comparison, snr, condition)) else {
                        // Combination never presented; absence is not an error.
                        continue;
                    };
                    if rows.len() != expected_count {
                        debug!(
                            "dropping cell ({subject}, {comparison}, {snr}, {condition}): \
                             {} trials, expected {expected_count}",
                            rows.len()
                        );
                        stats.groups_dropped += 1;
                        for &idx in rows {
                            keep[idx] = false;
                        }
                    }
                }
            }
        }
    }

    records
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(r, _)| (*r).clone())
        .collect()
}

/// Distinct values of one field, in first-appearance order.
fn distinct<'a>(
    records: &[&'a Observation],
    field: impl Fn(&'a Observation) -> &'a str,
) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for &r in records {
        let value = field(r);
        if seen.insert(value) {
            values.push(value);
        }
    }
    values
}

//! Organization and analysis of real-ear measurement data against
//! prescriptive targets.

use crate::data::{MeasuredRecord, RawMeasurement, TargetRecord};
use crate::error::{AudioValError, Result};
use crate::rem::{DeviationRecord, DeviationSet, GroupKey};
use crate::stats::{one_sample_ttest, OneSampleTTest};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Frequency bands and deviation ceilings for criterion scoring.
///
/// Low frequencies are held to a tighter ceiling than high frequencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub low_freqs: Vec<u32>,
    pub low_ceiling: f64,
    pub high_freqs: Vec<u32>,
    pub high_ceiling: f64,
}

impl Default for CriterionConfig {
    fn default() -> Self {
        Self {
            low_freqs: vec![500, 1000, 2000],
            low_ceiling: 5.0,
            high_freqs: vec![3000, 4000],
            high_ceiling: 8.0,
        }
    }
}

/// Frequency band a criterion score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreqBand {
    Low,
    High,
}

impl fmt::Display for FreqBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreqBand::Low => f.write_str("low"),
            FreqBand::High => f.write_str("high"),
        }
    }
}

/// Criterion score for one group at one frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionScore {
    pub condition: String,
    pub form_factor: String,
    pub band: FreqBand,
    pub freq: u32,
    /// Maximum tolerated |deviation| in dB for this band.
    pub ceiling: f64,
    /// Ears (left and right pooled) with |deviation| within the ceiling.
    pub ears_within: usize,
    pub ears_total: usize,
    pub percent_within: f64,
    /// One-sample t-test of the pooled signed deviations against the
    /// ceiling; absent when fewer than two ears contribute.
    pub t_test: Option<OneSampleTTest>,
}

/// Criterion scores across all groups and frequencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub scores: Vec<CriterionScore>,
}

impl AnalysisReport {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CriterionScore> {
        self.scores.iter()
    }

    /// Write the report to CSV.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        writeln!(
            writer,
            "condition,form_factor,band,freq,ceiling,ears_within,ears_total,percent_within,\
             t_statistic,df,p_value,ci_lower,ci_upper"
        )?;
        for s in &self.scores {
            write!(
                writer,
                "{},{},{},{},{},{},{},{:.1}",
                s.condition,
                s.form_factor,
                s.band,
                s.freq,
                s.ceiling,
                s.ears_within,
                s.ears_total,
                s.percent_within
            )?;
            match &s.t_test {
                Some(t) => writeln!(
                    writer,
                    ",{:.4},{},{:.4},{:.2},{:.2}",
                    t.statistic, t.df, t.p_value, t.ci_lower, t.ci_upper
                )?,
                None => writeln!(writer, ",,,,,")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Criterion Report")?;
        for s in &self.scores {
            write!(
                f,
                "  {}/{} {} Hz ({}, within {} dB): {:.1}% ({}/{} ears)",
                s.condition,
                s.form_factor,
                s.freq,
                s.band,
                s.ceiling,
                s.percent_within,
                s.ears_within,
                s.ears_total
            )?;
            match &s.t_test {
                Some(t) => writeln!(
                    f,
                    "; t({}) = {:.2}, p = {:.4}, 95% CI [{:.2}, {:.2}]",
                    t.df, t.statistic, t.p_value, t.ci_lower, t.ci_upper
                )?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// Organization and analysis methods for one study's measured and target
/// tables.
///
/// Construction backfills each measured row's form factor from the target
/// table, so every record downstream carries a complete key. All transforms
/// return new owned tables; the model itself is never mutated.
#[derive(Debug, Clone)]
pub struct DataModel {
    measured: Vec<MeasuredRecord>,
    targets: Vec<TargetRecord>,
}

impl DataModel {
    /// Build a model from raw measured rows and target rows.
    ///
    /// Each subject wears one form factor, established by the target table;
    /// that label is attached to every measured row for the subject.
    ///
    /// # Errors
    /// `UnassignableSubject` if a measured subject has no target entry.
    pub fn new(measured: Vec<RawMeasurement>, targets: Vec<TargetRecord>) -> Result<Self> {
        let mut form_factors: HashMap<&str, &str> = HashMap::new();
        for t in &targets {
            form_factors
                .entry(t.subject.as_str())
                .or_insert(t.form_factor.as_str());
        }

        let measured = measured
            .into_iter()
            .map(|m| {
                let form_factor = match form_factors.get(m.subject.as_str()) {
                    Some(f) => f.to_string(),
                    None => return Err(AudioValError::UnassignableSubject(m.subject)),
                };
                Ok(MeasuredRecord {
                    subject: m.subject,
                    condition: m.condition,
                    form_factor,
                    freq: m.freq,
                    left: m.left,
                    right: m.right,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "assigned form factors to {} measured rows across {} target rows",
            measured.len(),
            targets.len()
        );
        Ok(Self { measured, targets })
    }

    /// Measured rows with assigned form factors.
    pub fn measured(&self) -> &[MeasuredRecord] {
        &self.measured
    }

    /// Target rows.
    pub fn targets(&self) -> &[TargetRecord] {
        &self.targets
    }

    /// Keep only rows at the given frequencies, in both tables.
    pub fn retain_freqs(&self, freqs: &[u32]) -> DataModel {
        let keep: HashSet<u32> = freqs.iter().copied().collect();
        DataModel {
            measured: self
                .measured
                .iter()
                .filter(|m| keep.contains(&m.freq))
                .cloned()
                .collect(),
            targets: self
                .targets
                .iter()
                .filter(|t| keep.contains(&t.freq))
                .cloned()
                .collect(),
        }
    }

    /// Relabel form-factor categories into coarser buckets, in both tables.
    ///
    /// Labels absent from the mapping pass through unchanged. Used for an
    /// aggregate-level analysis alongside the per-form-factor one.
    pub fn collapse_form_factors(&self, mapping: &HashMap<String, String>) -> DataModel {
        let relabel = |label: &str| -> String {
            mapping
                .get(label)
                .cloned()
                .unwrap_or_else(|| label.to_string())
        };
        DataModel {
            measured: self
                .measured
                .iter()
                .map(|m| {
                    let mut m = m.clone();
                    m.form_factor = relabel(&m.form_factor);
                    m
                })
                .collect(),
            targets: self
                .targets
                .iter()
                .map(|t| {
                    let mut t = t.clone();
                    t.form_factor = relabel(&t.form_factor);
                    t
                })
                .collect(),
        }
    }

    /// Signed deviations of every measured row from its target.
    ///
    /// For each (condition, form factor) pair present in the measured table,
    /// each measured row is paired with its target row by an explicit key
    /// join on (subject, form factor, frequency); `left_diff` and
    /// `right_diff` are measured minus target. Pairing is key-matched, never
    /// positional, so row order cannot change any result.
    ///
    /// # Errors
    /// `MissingTarget` for a measured row with no target counterpart;
    /// `AmbiguousPairing` for duplicate join keys on either side.
    pub fn diff_from_target(&self) -> Result<DeviationSet> {
        let mut set = DeviationSet::new();
        for key in self.measured_group_keys() {
            let rows = self
                .measured
                .iter()
                .filter(|m| m.condition == key.condition && m.form_factor == key.form_factor);

            let mut reference: HashMap<(&str, u32), (f64, f64)> = HashMap::new();
            for t in self
                .targets
                .iter()
                .filter(|t| t.form_factor == key.form_factor)
            {
                if reference
                    .insert((t.subject.as_str(), t.freq), (t.left, t.right))
                    .is_some()
                {
                    return Err(AudioValError::AmbiguousPairing {
                        subject: t.subject.clone(),
                        form_factor: t.form_factor.clone(),
                        freq: t.freq,
                    });
                }
            }

            let records = diff_rows(rows, &reference)?;
            set.insert(key, records);
        }
        Ok(set)
    }

    /// Signed differences between two fitting conditions.
    ///
    /// Computes `minuend - subtrahend` per ear for every subject present in
    /// *both* conditions, paired by the same key join as
    /// [`diff_from_target`](Self::diff_from_target). Output records carry the
    /// subtrahend condition's rows extended with diffs, grouped by
    /// (subtrahend condition, form factor).
    pub fn diff_between_conditions(
        &self,
        minuend: &str,
        subtrahend: &str,
    ) -> Result<DeviationSet> {
        let in_minuend: HashSet<&str> = self
            .measured
            .iter()
            .filter(|m| m.condition == minuend)
            .map(|m| m.subject.as_str())
            .collect();
        let in_subtrahend: HashSet<&str> = self
            .measured
            .iter()
            .filter(|m| m.condition == subtrahend)
            .map(|m| m.subject.as_str())
            .collect();
        let common: HashSet<&str> = in_minuend.intersection(&in_subtrahend).copied().collect();

        let mut set = DeviationSet::new();
        for key in self.measured_group_keys() {
            if key.condition != subtrahend {
                continue;
            }

            let mut reference: HashMap<(&str, u32), (f64, f64)> = HashMap::new();
            for m in self.measured.iter().filter(|m| {
                m.condition == minuend
                    && m.form_factor == key.form_factor
                    && common.contains(m.subject.as_str())
            }) {
                if reference
                    .insert((m.subject.as_str(), m.freq), (m.left, m.right))
                    .is_some()
                {
                    return Err(AudioValError::AmbiguousPairing {
                        subject: m.subject.clone(),
                        form_factor: m.form_factor.clone(),
                        freq: m.freq,
                    });
                }
            }

            let rows = self.measured.iter().filter(|m| {
                m.condition == key.condition
                    && m.form_factor == key.form_factor
                    && common.contains(m.subject.as_str())
            });
            let records = diff_rows(rows, &reference)?;
            if !records.is_empty() {
                set.insert(key, records);
            }
        }
        Ok(set)
    }

    /// Score target deviations against per-band ceilings.
    ///
    /// For each deviation group and each configured frequency, reports the
    /// percentage of ears (left and right pooled) whose |deviation| is
    /// within the band's ceiling, and a two-sided one-sample t-test of the
    /// pooled signed deviations against the ceiling.
    pub fn analyze(&self, criteria: &CriterionConfig) -> Result<AnalysisReport> {
        let deviations = self.diff_from_target()?;
        let mut scores = Vec::new();
        for (key, records) in deviations.iter() {
            let bands = [
                (FreqBand::Low, &criteria.low_freqs, criteria.low_ceiling),
                (FreqBand::High, &criteria.high_freqs, criteria.high_ceiling),
            ];
            for (band, freqs, ceiling) in bands {
                for &freq in freqs.iter() {
                    let diffs: Vec<f64> = records
                        .iter()
                        .filter(|r| r.freq == freq)
                        .flat_map(|r| [r.left_diff, r.right_diff])
                        .collect();
                    if diffs.is_empty() {
                        continue;
                    }
                    let ears_within = diffs.iter().filter(|d| d.abs() <= ceiling).count();
                    let ears_total = diffs.len();
                    let t_test = if ears_total >= 2 {
                        Some(one_sample_ttest(&diffs, ceiling)?)
                    } else {
                        None
                    };
                    scores.push(CriterionScore {
                        condition: key.condition.clone(),
                        form_factor: key.form_factor.clone(),
                        band,
                        freq,
                        ceiling,
                        ears_within,
                        ears_total,
                        percent_within: ears_within as f64 / ears_total as f64 * 100.0,
                        t_test,
                    });
                }
            }
        }
        info!("scored {} group/frequency cells", scores.len());
        Ok(AnalysisReport { scores })
    }

    /// Distinct (condition, form factor) pairs in the measured table, in
    /// first-appearance order.
    fn measured_group_keys(&self) -> Vec<GroupKey> {
        let mut keys: Vec<GroupKey> = Vec::new();
        for m in &self.measured {
            if !keys
                .iter()
                .any(|k| k.condition == m.condition && k.form_factor == m.form_factor)
            {
                keys.push(GroupKey::new(m.condition.clone(), m.form_factor.clone()));
            }
        }
        keys
    }
}

/// Difference each measured row against its reference row, key-joined.
fn diff_rows<'a>(
    rows: impl Iterator<Item = &'a MeasuredRecord>,
    reference: &HashMap<(&str, u32), (f64, f64)>,
) -> Result<Vec<DeviationRecord>> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for m in rows {
        if !seen.insert((m.subject.clone(), m.freq)) {
            return Err(AudioValError::AmbiguousPairing {
                subject: m.subject.clone(),
                form_factor: m.form_factor.clone(),
                freq: m.freq,
            });
        }
        let (ref_left, ref_right) = reference
            .get(&(m.subject.as_str(), m.freq))
            .copied()
            .ok_or_else(|| AudioValError::MissingTarget {
                subject: m.subject.clone(),
                form_factor: m.form_factor.clone(),
                freq: m.freq,
            })?;
        records.push(DeviationRecord {
            subject: m.subject.clone(),
            condition: m.condition.clone(),
            form_factor: m.form_factor.clone(),
            freq: m.freq,
            left: m.left,
            right: m.right,
            left_diff: m.left - ref_left,
            right_diff: m.right - ref_right,
        });
    }
    records.sort_by(|a, b| (&a.subject, a.freq).cmp(&(&b.subject, b.freq)));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(subject: &str, condition: &str, freq: u32, left: f64, right: f64) -> RawMeasurement {
        RawMeasurement {
            subject: subject.to_string(),
            condition: condition.to_string(),
            freq,
            left,
            right,
        }
    }

    fn target(subject: &str, form_factor: &str, freq: u32, left: f64, right: f64) -> TargetRecord {
        TargetRecord {
            subject: subject.to_string(),
            form_factor: form_factor.to_string(),
            freq,
            left,
            right,
        }
    }

    #[test]
    fn test_form_factor_assignment() {
        let model = DataModel::new(
            vec![measurement("S1", "BestFit", 1000, 50.0, 52.0)],
            vec![target("S1", "RIC_RT", 1000, 45.0, 50.0)],
        )
        .unwrap();

        assert_eq!(model.measured()[0].form_factor, "RIC_RT");
    }

    #[test]
    fn test_unassignable_subject() {
        let result = DataModel::new(
            vec![measurement("S2", "BestFit", 1000, 50.0, 52.0)],
            vec![target("S1", "RIC_RT", 1000, 45.0, 50.0)],
        );
        assert!(matches!(
            result,
            Err(AudioValError::UnassignableSubject(s)) if s == "S2"
        ));
    }

    #[test]
    fn test_diff_from_target() {
        let model = DataModel::new(
            vec![measurement("S1", "TargetMatch", 1000, 50.0, 52.0)],
            vec![target("S1", "RIC_RT", 1000, 45.0, 50.0)],
        )
        .unwrap();

        let set = model.diff_from_target().unwrap();
        let rows = set.get(&GroupKey::new("TargetMatch", "RIC_RT")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].left_diff, 5.0);
        assert_eq!(rows[0].right_diff, 2.0);
    }

    #[test]
    fn test_diff_is_order_independent() {
        let measured = vec![
            measurement("S2", "TargetMatch", 1000, 60.0, 61.0),
            measurement("S1", "TargetMatch", 2000, 55.0, 56.0),
            measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
        ];
        let targets = vec![
            target("S1", "RIC_RT", 1000, 45.0, 50.0),
            target("S1", "RIC_RT", 2000, 50.0, 50.0),
            target("S2", "RIC_RT", 1000, 58.0, 58.0),
        ];

        let forward = DataModel::new(measured.clone(), targets.clone())
            .unwrap()
            .diff_from_target()
            .unwrap();
        let mut shuffled = measured;
        shuffled.reverse();
        let reversed = DataModel::new(shuffled, targets)
            .unwrap()
            .diff_from_target()
            .unwrap();

        let key = GroupKey::new("TargetMatch", "RIC_RT");
        assert_eq!(forward.get(&key).unwrap(), reversed.get(&key).unwrap());
    }

    #[test]
    fn test_missing_target_row_fails_loudly() {
        let model = DataModel::new(
            vec![
                measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
                measurement("S1", "TargetMatch", 2000, 55.0, 56.0),
            ],
            vec![target("S1", "RIC_RT", 1000, 45.0, 50.0)],
        )
        .unwrap();

        assert!(matches!(
            model.diff_from_target(),
            Err(AudioValError::MissingTarget { freq: 2000, .. })
        ));
    }

    #[test]
    fn test_duplicate_measured_key_is_ambiguous() {
        let model = DataModel::new(
            vec![
                measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
                measurement("S1", "TargetMatch", 1000, 51.0, 53.0),
            ],
            vec![target("S1", "RIC_RT", 1000, 45.0, 50.0)],
        )
        .unwrap();

        assert!(matches!(
            model.diff_from_target(),
            Err(AudioValError::AmbiguousPairing { .. })
        ));
    }

    #[test]
    fn test_collapse_unions_groups_with_diffs_unchanged() {
        let measured = vec![
            measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
            measurement("S2", "TargetMatch", 1000, 60.0, 62.0),
            measurement("S3", "TargetMatch", 1000, 70.0, 72.0),
        ];
        let targets = vec![
            target("S1", "RIC_RT", 1000, 45.0, 50.0),
            target("S2", "RIC312", 1000, 58.0, 60.0),
            target("S3", "MRIC", 1000, 65.0, 70.0),
        ];
        let model = DataModel::new(measured, targets).unwrap();
        let split = model.diff_from_target().unwrap();

        let mapping: HashMap<String, String> = [
            ("RIC_RT".to_string(), "allRIC".to_string()),
            ("RIC312".to_string(), "allRIC".to_string()),
            ("MRIC".to_string(), "allRIC".to_string()),
        ]
        .into();
        let collapsed = model.collapse_form_factors(&mapping).diff_from_target().unwrap();

        let rows = collapsed
            .get(&GroupKey::new("TargetMatch", "allRIC"))
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(collapsed.n_groups(), 1);

        // Diffs are the union of the split groups' diffs, relabeled.
        let mut split_diffs: Vec<(String, f64, f64)> = split
            .records()
            .map(|r| (r.subject.clone(), r.left_diff, r.right_diff))
            .collect();
        split_diffs.sort_by(|a, b| a.0.cmp(&b.0));
        let collapsed_diffs: Vec<(String, f64, f64)> = rows
            .iter()
            .map(|r| (r.subject.clone(), r.left_diff, r.right_diff))
            .collect();
        assert_eq!(split_diffs, collapsed_diffs);
        assert!(rows.iter().all(|r| r.form_factor == "allRIC"));
    }

    #[test]
    fn test_diff_between_conditions_restricted_to_common_subjects() {
        // S1 has both conditions; S2 has only TargetMatch.
        let measured = vec![
            measurement("S1", "BestFit", 1000, 55.0, 57.0),
            measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
            measurement("S2", "TargetMatch", 1000, 60.0, 62.0),
        ];
        let targets = vec![
            target("S1", "RIC_RT", 1000, 45.0, 50.0),
            target("S2", "RIC_RT", 1000, 58.0, 60.0),
        ];
        let model = DataModel::new(measured, targets).unwrap();

        let set = model.diff_between_conditions("BestFit", "TargetMatch").unwrap();
        let rows = set.get(&GroupKey::new("TargetMatch", "RIC_RT")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "S1");
        assert_eq!(rows[0].left_diff, 5.0);
        assert_eq!(rows[0].right_diff, 5.0);
    }

    #[test]
    fn test_analyze_scores_ears_against_ceiling() {
        // Two subjects, diffs at 1000 Hz: S1 (5, 2), S2 (7, -1).
        let measured = vec![
            measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
            measurement("S2", "TargetMatch", 1000, 65.0, 59.0),
        ];
        let targets = vec![
            target("S1", "RIC_RT", 1000, 45.0, 50.0),
            target("S2", "RIC_RT", 1000, 58.0, 60.0),
        ];
        let model = DataModel::new(measured, targets).unwrap();

        let criteria = CriterionConfig {
            low_freqs: vec![1000],
            low_ceiling: 5.0,
            high_freqs: vec![],
            high_ceiling: 8.0,
        };
        let report = model.analyze(&criteria).unwrap();

        assert_eq!(report.len(), 1);
        let score = &report.scores[0];
        // |5|, |2|, |-1| within 5 dB; |7| outside.
        assert_eq!(score.ears_within, 3);
        assert_eq!(score.ears_total, 4);
        assert!((score.percent_within - 75.0).abs() < 1e-10);
        assert!(score.t_test.is_some());
    }

    #[test]
    fn test_retain_freqs() {
        let model = DataModel::new(
            vec![
                measurement("S1", "TargetMatch", 1000, 50.0, 52.0),
                measurement("S1", "TargetMatch", 12000, 40.0, 41.0),
            ],
            vec![
                target("S1", "RIC_RT", 1000, 45.0, 50.0),
                target("S1", "RIC_RT", 12000, 39.0, 40.0),
            ],
        )
        .unwrap();

        let trimmed = model.retain_freqs(&[1000]);
        assert_eq!(trimmed.measured().len(), 1);
        assert_eq!(trimmed.targets().len(), 1);
    }
}

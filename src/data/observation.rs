//! Paired-comparison trial records and their CSV import.

use crate::error::{AudioValError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// File name pattern for exported session files:
/// `NNNN_<cond>_NNNN_<Mon>_NN_NNNN.csv`.
const SESSION_FILE_PATTERN: &str =
    r"^\d{4}_\w+_\d{4}_(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)_\d{2}_\d{4}\.csv$";

/// One raw paired-comparison trial as exported by the presentation software.
///
/// Unknown extra columns in the export are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub subject: String,
    pub condition: String,
    #[serde(rename = "button_A")]
    pub button_a: String,
    #[serde(rename = "button_B")]
    pub button_b: String,
    pub audio_file: String,
    pub outcome: String,
}

/// Trial classification derived from the stimulus track number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialType {
    /// Preference trial (speech stimulus).
    Pref,
    /// Noise-acceptance trial.
    Noise,
}

impl fmt::Display for TrialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialType::Pref => f.write_str("pref"),
            TrialType::Noise => f.write_str("noise"),
        }
    }
}

/// A raw trial extended with the derived classification columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub subject: String,
    pub condition: String,
    #[serde(rename = "button_A")]
    pub button_a: String,
    #[serde(rename = "button_B")]
    pub button_b: String,
    pub audio_file: String,
    pub outcome: String,
    /// Canonicalized `button_A-button_B` label.
    pub comparison: String,
    /// 5th underscore-delimited token of `audio_file`.
    pub snr: String,
    /// 1st underscore-delimited token of `audio_file`.
    pub track: String,
    pub trial_type: TrialType,
}

/// Check a session file name against the export naming convention.
fn is_valid_session_name(name: &str) -> bool {
    let pattern = Regex::new(SESSION_FILE_PATTERN).unwrap();
    pattern.is_match(name)
}

/// Read raw trials from a single session CSV.
pub fn read_observations_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawObservation>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: RawObservation = row?;
        records.push(record);
    }
    Ok(records)
}

/// Read and concatenate every session CSV in a directory.
///
/// Each file name is checked against the export naming convention first.
/// If any name fails, the whole import fails with `InvalidFileName` listing
/// every offending file; no partial data set is produced.
///
/// # Arguments
/// * `dir` - Directory containing the exported session CSV files.
///
/// # Returns
/// All trials concatenated in file-name order.
pub fn read_observations_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<RawObservation>> {
    info!("importing session files from {:?}", dir.as_ref());
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "csv").unwrap_or(false))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AudioValError::EmptyData(
            "No CSV files found in data directory".to_string(),
        ));
    }

    let mut invalid = Vec::new();
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("importing: {}", name);
        if !is_valid_session_name(&name) {
            invalid.push(name);
        }
    }
    if !invalid.is_empty() {
        return Err(AudioValError::InvalidFileName(invalid.join(", ")));
    }

    let mut records = Vec::new();
    for path in &paths {
        records.extend(read_observations_csv(path)?);
    }
    info!("imported {} trials from {} files", records.len(), paths.len());

    if records.is_empty() {
        return Err(AudioValError::EmptyData(
            "Session files contained no trials".to_string(),
        ));
    }
    Ok(records)
}

/// Write derived observations to CSV (input columns plus derived columns).
pub fn write_observations_csv<P: AsRef<Path>>(path: P, records: &[Observation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

//! Real-ear measurement and prescriptive-target records and their CSV import.

use crate::error::{AudioValError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One measured real-ear row before a form factor has been assigned.
///
/// Parsed from a probe-microphone export whose `filename` column is
/// `<subject>_<condition>`; levels are for 65 dB SPL speech input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub subject: String,
    pub condition: String,
    pub freq: u32,
    pub left: f64,
    pub right: f64,
}

/// A measured real-ear row with its subject's form factor attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredRecord {
    pub subject: String,
    pub condition: String,
    pub form_factor: String,
    pub freq: u32,
    pub left: f64,
    pub right: f64,
}

/// One prescriptive-target row per subject, form factor, and frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub subject: String,
    pub form_factor: String,
    pub freq: u32,
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Deserialize)]
struct VerifitRow {
    filename: String,
    freq: u32,
    left65: f64,
    right65: f64,
}

#[derive(Debug, Deserialize)]
struct TargetRow {
    filename: String,
    form_factor: String,
    freq: u32,
    left: f64,
    right: f64,
}

/// Read measured real-ear rows from a probe-microphone export CSV.
///
/// The `filename` column must be exactly `<subject>_<condition>`.
pub fn read_verifit<P: AsRef<Path>>(path: P) -> Result<Vec<RawMeasurement>> {
    let mut reader = csv::Reader::from_path(&path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: VerifitRow = row?;
        let mut parts = row.filename.split('_');
        let (subject, condition) = match (parts.next(), parts.next(), parts.next()) {
            (Some(subject), Some(condition), None) if !subject.is_empty() => {
                (subject.to_string(), condition.to_string())
            }
            _ => return Err(AudioValError::InvalidFileName(row.filename)),
        };
        records.push(RawMeasurement {
            subject,
            condition,
            freq: row.freq,
            left: row.left65,
            right: row.right65,
        });
    }
    if records.is_empty() {
        return Err(AudioValError::EmptyData(
            "No measured rows in export".to_string(),
        ));
    }
    info!("read {} measured rows", records.len());
    Ok(records)
}

/// Read prescriptive-target rows from a target export CSV.
///
/// The subject is the first underscore-delimited token of the `filename`
/// column; the remainder of the name is session bookkeeping and is dropped.
pub fn read_targets<P: AsRef<Path>>(path: P) -> Result<Vec<TargetRecord>> {
    let mut reader = csv::Reader::from_path(&path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: TargetRow = row?;
        let subject = match row.filename.split('_').next() {
            Some(subject) if !subject.is_empty() => subject.to_string(),
            _ => return Err(AudioValError::InvalidFileName(row.filename)),
        };
        records.push(TargetRecord {
            subject,
            form_factor: row.form_factor,
            freq: row.freq,
            left: row.left,
            right: row.right,
        });
    }
    if records.is_empty() {
        return Err(AudioValError::EmptyData(
            "No target rows in export".to_string(),
        ));
    }
    info!("read {} target rows", records.len());
    Ok(records)
}

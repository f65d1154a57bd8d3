//! Analysis configuration shared by the REM pipeline entry points.

use crate::error::{AudioValError, Result};
use crate::rem::CriterionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters of one REM analysis run.
///
/// The defaults mirror the study protocol: audiometric frequencies from 250
/// to 8000 Hz, a 5 dB ceiling in the low band and 8 dB in the high band, and
/// receiver-in-canal and custom form factors collapsed for the aggregate
/// analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Frequencies retained for analysis.
    pub freqs: Vec<u32>,
    /// Frequency bands and deviation ceilings for criterion scoring.
    pub criteria: CriterionConfig,
    /// Form-factor collapse map for the aggregate-level analysis.
    pub collapse: HashMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let collapse = [
            ("RIC_RT", "allRIC"),
            ("RIC312", "allRIC"),
            ("MRIC", "allRIC"),
            ("ITC", "WirelessCustoms"),
            ("ITE", "WirelessCustoms"),
            ("CIC", "WirelessCustoms"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            freqs: vec![250, 500, 1000, 1500, 2000, 3000, 4000, 6000, 8000],
            criteria: CriterionConfig::default(),
            collapse,
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(AudioValError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(AudioValError::from)
    }
}

//! Analysis pipelines for clinical hearing-aid validation studies.
//!
//! This library reorganizes CSV exports from three independent validation
//! experiments into analysis-ready tables, removes incomplete records, and
//! computes deviation and score statistics:
//!
//! - **dam**: paired-comparison preference data: derive classification
//!   columns, canonicalize mirrored comparison labels, and drop incomplete
//!   subject/comparison/SNR/condition cells.
//! - **rem**: real-ear measurement data: pair measured levels with
//!   prescriptive targets per subject, form factor, and frequency, compute
//!   signed per-ear deviations, and score them against per-band ceilings.
//! - **sin**: speech-in-noise scores: split combined word/sentence score
//!   tables and run Friedman and pairwise Wilcoxon tests across conditions.
//!
//! # Example
//!
//! ```no_run
//! use audioval::prelude::*;
//!
//! let raw = read_observations_dir("results").unwrap();
//! let organized = organize(&raw).unwrap();
//! let clean = remove_incomplete(&organized);
//!
//! let measured = read_verifit("verifit.csv").unwrap();
//! let targets = read_targets("estat.csv").unwrap();
//! let model = DataModel::new(measured, targets).unwrap();
//! let deviations = model.diff_from_target().unwrap();
//! deviations.write_csv("estat_diffs.csv").unwrap();
//! ```

pub mod config;
pub mod dam;
pub mod data;
pub mod error;
pub mod rem;
pub mod sin;
pub mod stats;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::AnalysisConfig;
    pub use crate::dam::{
        canonical_comparison, organize, remove_incomplete, remove_incomplete_with,
        remove_incomplete_with_stats, CompletenessStats, EXPECTED_TRIALS, NOISE_TRACKS,
    };
    pub use crate::data::{
        read_observations_csv, read_observations_dir, read_targets, read_verifit,
        write_observations_csv, MeasuredRecord, Observation, RawMeasurement, RawObservation,
        TargetRecord, TrialType,
    };
    pub use crate::error::{AudioValError, Result};
    pub use crate::rem::{
        AnalysisReport, CriterionConfig, CriterionScore, DataModel, DeviationRecord, DeviationSet,
        FreqBand, GroupKey,
    };
    pub use crate::sin::{organize_scores, ScoreTable};
    pub use crate::stats::{
        friedman_test, one_sample_ttest, wilcoxon_pairwise, wilcoxon_signed_rank, FriedmanTest,
        OneSampleTTest, WilcoxonPair, WilcoxonTest,
    };
}

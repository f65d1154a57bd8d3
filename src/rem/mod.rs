//! Real-ear measurement (REM) pipeline: pair measured levels with
//! prescriptive targets and score the signed deviations.

mod deviation;
mod model;

pub use deviation::{DeviationRecord, DeviationSet, GroupKey};
pub use model::{AnalysisReport, CriterionConfig, CriterionScore, DataModel, FreqBand};

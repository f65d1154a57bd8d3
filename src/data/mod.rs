//! Record types and CSV readers for the validation study exports.

mod measurement;
mod observation;

pub use measurement::{read_targets, read_verifit, MeasuredRecord, RawMeasurement, TargetRecord};
pub use observation::{
    read_observations_csv, read_observations_dir, write_observations_csv, Observation,
    RawObservation, TrialType,
};

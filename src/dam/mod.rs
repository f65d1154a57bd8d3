//! Paired-comparison (DAM) pipeline: derive classification columns,
//! canonicalize mirrored comparison labels, and drop incomplete cells.

mod complete;
mod organize;

pub use complete::{
    remove_incomplete, remove_incomplete_with, remove_incomplete_with_stats, CompletenessStats,
    EXPECTED_TRIALS,
};
pub use organize::{canonical_comparison, organize, NOISE_TRACKS};

//! Speech-in-noise (SIN) pipeline: split combined word/sentence score
//! tables and test for condition effects.

mod scores;

pub use scores::{organize_scores, organize_scores_from, ScoreColumn, ScoreTable};

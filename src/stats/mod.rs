//! Statistical tests used by the deviation and score analyses.

mod friedman;
mod rank;
mod ttest;
mod wilcoxon;

pub use friedman::{friedman_test, FriedmanTest};
pub use ttest::{one_sample_ttest, OneSampleTTest};
pub use wilcoxon::{wilcoxon_pairwise, wilcoxon_signed_rank, WilcoxonPair, WilcoxonTest};

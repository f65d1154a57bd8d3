//! Wilcoxon signed-rank test for paired samples.

use crate::error::{AudioValError, Result};
use crate::stats::rank::average_ranks;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// Result of a Wilcoxon signed-rank test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilcoxonTest {
    /// The smaller of the positive and negative rank sums.
    pub statistic: f64,
    /// Two-sided p-value (normal approximation).
    pub p_value: f64,
    /// Pairs remaining after zero differences are discarded.
    pub n: usize,
}

impl fmt::Display for WilcoxonTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "W = {:.1}, p = {:.3} (n = {})",
            self.statistic, self.p_value, self.n
        )
    }
}

/// One named pairwise comparison between two score columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilcoxonPair {
    pub a: String,
    pub b: String,
    pub test: WilcoxonTest,
}

/// Wilcoxon signed-rank test of paired samples `x` and `y`.
///
/// Zero differences are discarded; the absolute differences are ranked with
/// ties averaged; the statistic is the smaller signed-rank sum and the
/// p-value comes from the tie-corrected normal approximation.
///
/// # Errors
/// `InvalidParameter` for mismatched lengths or when every difference is
/// zero.
pub fn wilcoxon_signed_rank(x: &[f64], y: &[f64]) -> Result<WilcoxonTest> {
    if x.len() != y.len() {
        return Err(AudioValError::InvalidParameter(
            "Wilcoxon test needs samples of equal length".to_string(),
        ));
    }

    let diffs: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(a, b)| a - b)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Err(AudioValError::InvalidParameter(
            "Wilcoxon test is undefined when every difference is zero".to_string(),
        ));
    }

    let abs_diffs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, tie_term) = average_ranks(&abs_diffs);

    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let n_f = n as f64;
    let w_minus = n_f * (n_f + 1.0) / 2.0 - w_plus;
    let statistic = w_plus.min(w_minus);

    let mean = n_f * (n_f + 1.0) / 4.0;
    let var = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_term / 48.0;
    let sd = var.sqrt();
    let p_value = if sd == 0.0 {
        1.0
    } else {
        let normal = Normal::new(0.0, 1.0).unwrap();
        let z = (statistic - mean) / sd;
        (2.0 * normal.cdf(z)).min(1.0)
    };

    Ok(WilcoxonTest {
        statistic,
        p_value,
        n,
    })
}

/// Wilcoxon signed-rank tests for every unordered pair of columns.
///
/// `names` labels the columns; results are in combination order
/// (first-vs-second, first-vs-third, ...).
pub fn wilcoxon_pairwise<S: AsRef<str>>(
    names: &[S],
    columns: &[Vec<f64>],
) -> Result<Vec<WilcoxonPair>> {
    if names.len() != columns.len() {
        return Err(AudioValError::InvalidParameter(
            "Pairwise Wilcoxon needs one name per column".to_string(),
        ));
    }
    let mut pairs = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            pairs.push(WilcoxonPair {
                a: names[i].as_ref().to_string(),
                b: names[j].as_ref().to_string(),
                test: wilcoxon_signed_rank(&columns[i], &columns[j])?,
            });
        }
    }
    Ok(pairs)
}

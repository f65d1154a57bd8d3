//! Friedman rank-sum test for repeated measures across conditions.

use crate::error::{AudioValError, Result};
use crate::stats::rank::average_ranks;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::fmt;

/// Result of a Friedman test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriedmanTest {
    /// Chi-square statistic (tie-corrected).
    pub statistic: f64,
    /// Degrees of freedom (k - 1).
    pub df: usize,
    pub p_value: f64,
    pub n_blocks: usize,
    pub n_treatments: usize,
}

impl fmt::Display for FriedmanTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chi2({}) = {:.3}, p = {:.3} ({} blocks, {} treatments)",
            self.df, self.statistic, self.p_value, self.n_blocks, self.n_treatments
        )
    }
}

/// Friedman test over `treatments`, each a column of per-block values.
///
/// Blocks (subjects) are ranked across treatments with ties averaged; the
/// chi-square statistic carries the standard tie correction and is referred
/// to a chi-squared distribution with k - 1 degrees of freedom.
///
/// # Errors
/// `InvalidParameter` for fewer than 3 treatments, mismatched column
/// lengths, fewer than 2 blocks, or data tied within every block (the
/// statistic is undefined).
pub fn friedman_test(treatments: &[Vec<f64>]) -> Result<FriedmanTest> {
    let k = treatments.len();
    if k < 3 {
        return Err(AudioValError::InvalidParameter(
            "Friedman test needs at least 3 treatments".to_string(),
        ));
    }
    let n = treatments[0].len();
    if treatments.iter().any(|t| t.len() != n) {
        return Err(AudioValError::InvalidParameter(
            "Friedman test treatments must have equal length".to_string(),
        ));
    }
    if n < 2 {
        return Err(AudioValError::InvalidParameter(
            "Friedman test needs at least 2 blocks".to_string(),
        ));
    }

    let mut rank_sums = vec![0.0; k];
    let mut tie_term = 0.0;
    for block in 0..n {
        let row: Vec<f64> = treatments.iter().map(|t| t[block]).collect();
        let (ranks, ties) = average_ranks(&row);
        tie_term += ties;
        for (j, r) in ranks.iter().enumerate() {
            rank_sums[j] += r;
        }
    }

    let (n_f, k_f) = (n as f64, k as f64);
    let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
    let uncorrected = 12.0 / (n_f * k_f * (k_f + 1.0)) * ssbn - 3.0 * n_f * (k_f + 1.0);
    let correction = 1.0 - tie_term / (n_f * (k_f * k_f * k_f - k_f));
    if correction <= 0.0 {
        return Err(AudioValError::InvalidParameter(
            "Friedman test is undefined when every block is fully tied".to_string(),
        ));
    }

    let statistic = uncorrected / correction;
    let df = k - 1;
    let chi2 = ChiSquared::new(df as f64).unwrap();
    let p_value = 1.0 - chi2.cdf(statistic);

    Ok(FriedmanTest {
        statistic,
        df,
        p_value,
        n_blocks: n,
        n_treatments: k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        // Block ranks: three blocks 1-2-3, one block 1-3-2.
        let treatments = vec![
            vec![1.0, 1.0, 1.0, 1.0],
            vec![2.0, 2.0, 2.0, 3.0],
            vec![3.0, 3.0, 3.0, 2.0],
        ];
        let result = friedman_test(&treatments).unwrap();

        assert_eq!(result.df, 2);
        assert!((result.statistic - 6.5).abs() < 1e-10);
        assert!((result.p_value - 0.0388).abs() < 1e-3);
    }

    #[test]
    fn test_no_treatment_effect() {
        // Rank orders balanced across blocks.
        let treatments = vec![
            vec![1.0, 3.0, 2.0],
            vec![2.0, 1.0, 3.0],
            vec![3.0, 2.0, 1.0],
        ];
        let result = friedman_test(&treatments).unwrap();
        assert!(result.statistic.abs() < 1e-10);
        assert!((result.p_value - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_requires_three_treatments() {
        let treatments = vec![vec![1.0, 2.0], vec![2.0, 3.0]];
        assert!(friedman_test(&treatments).is_err());
    }

    #[test]
    fn test_fully_tied_blocks_are_undefined() {
        let treatments = vec![
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
        ];
        assert!(friedman_test(&treatments).is_err());
    }
}

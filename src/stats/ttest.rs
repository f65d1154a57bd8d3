//! One-sample t-test against a fixed criterion value.

use crate::error::{AudioValError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of a two-sided one-sample t-test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneSampleTTest {
    /// t statistic.
    pub statistic: f64,
    /// Degrees of freedom (n - 1).
    pub df: usize,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Sample mean.
    pub sample_mean: f64,
    /// 95% confidence interval for the mean.
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Test whether the mean of `sample` differs from `popmean`.
///
/// Non-finite observations are omitted. The statistic is
/// `(mean - popmean) / SE` against a t-distribution with n - 1 degrees of
/// freedom; the confidence interval uses the same distribution's 97.5%
/// quantile.
///
/// A zero-variance sample yields a degenerate result rather than an error:
/// p = 1 when the mean equals `popmean` exactly, p = 0 otherwise, with a
/// point confidence interval.
pub fn one_sample_ttest(sample: &[f64], popmean: f64) -> Result<OneSampleTTest> {
    let values: Vec<f64> = sample.iter().copied().filter(|v| v.is_finite()).collect();
    let n = values.len();
    if n < 2 {
        return Err(AudioValError::InvalidParameter(
            "One-sample t-test needs at least two finite observations".to_string(),
        ));
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let se = (var / n as f64).sqrt();
    let df = n - 1;

    if se == 0.0 {
        let identical = mean == popmean;
        return Ok(OneSampleTTest {
            statistic: if identical {
                0.0
            } else {
                f64::INFINITY.copysign(mean - popmean)
            },
            df,
            p_value: if identical { 1.0 } else { 0.0 },
            sample_mean: mean,
            ci_lower: mean,
            ci_upper: mean,
        });
    }

    let t_dist = StudentsT::new(0.0, 1.0, df as f64).unwrap();
    let statistic = (mean - popmean) / se;
    let p_value = 2.0 * (1.0 - t_dist.cdf(statistic.abs()));
    let t_crit = t_dist.inverse_cdf(0.975);

    Ok(OneSampleTTest {
        statistic,
        df,
        p_value,
        sample_mean: mean,
        ci_lower: mean - t_crit * se,
        ci_upper: mean + t_crit * se,
    })
}

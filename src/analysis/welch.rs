//! Welch's unequal-variance two-sample t-test.
//!
//! The statistic is oriented as `(mean(a) - mean(b)) / se`, with `a` the
//! no-advertising period and `b` the advertising period, so a sales lift
//! produces a negative t.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{EvalError, EvalResult, Stage};
use crate::statistics::{mean, sample_variance};

/// Size, mean and unbiased variance of one sample.
///
/// The resampling loop compares thousands of synthetic samples against the
/// same observed period, so the observed summary is computed once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    /// Number of observations.
    pub n: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Unbiased sample variance.
    pub variance: f64,
}

impl SampleSummary {
    /// Summarize `values`.
    ///
    /// # Errors
    ///
    /// `InputData` if there are fewer than two observations, for which the
    /// sample variance is undefined.
    pub fn of(values: &[f64]) -> EvalResult<Self> {
        if values.len() < 2 {
            return Err(EvalError::input(
                Stage::Hypothesis,
                format!(
                    "Welch's test needs at least two days per period, got {}",
                    values.len()
                ),
            ));
        }
        Ok(Self {
            n: values.len(),
            mean: mean(values),
            variance: sample_variance(values),
        })
    }

    /// Summarize unit counts scaled to dollars without materializing them.
    pub(crate) fn of_units(units: &[u32], unit_price: f64) -> Self {
        let n = units.len();
        let sum: f64 = units.iter().map(|&u| u as f64).sum();
        let mean_units = sum / n as f64;
        let ss: f64 = units
            .iter()
            .map(|&u| (u as f64 - mean_units).powi(2))
            .sum();
        let variance = if n > 1 { ss / (n - 1) as f64 } else { 0.0 };
        Self {
            n,
            mean: mean_units * unit_price,
            variance: variance * unit_price * unit_price,
        }
    }
}

/// Outcome of Welch's t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    /// Welch's t statistic, infinite when both periods are constant and differ.
    #[serde(with = "crate::output::float")]
    pub t_statistic: f64,
    /// Two-sided p-value from Student's t with `dof` degrees of freedom.
    #[serde(with = "crate::output::float")]
    pub p_value: f64,
    /// Welch-Satterthwaite degrees of freedom.
    #[serde(with = "crate::output::float")]
    pub dof: f64,
}

/// Run Welch's t-test on two observed samples.
///
/// # Errors
///
/// `InputData` if either sample has fewer than two observations.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> EvalResult<WelchTest> {
    Ok(welch_from_summaries(&SampleSummary::of(a)?, &SampleSummary::of(b)?))
}

/// Welch's t-test from precomputed summaries.
///
/// When both samples have zero variance the standard error vanishes: equal
/// means give `t = 0` with p-value 1, different means give an infinite t
/// with p-value 0, and the degrees of freedom fall back to `n_a + n_b - 2`.
pub fn welch_from_summaries(a: &SampleSummary, b: &SampleSummary) -> WelchTest {
    let va = a.variance / a.n as f64;
    let vb = b.variance / b.n as f64;
    let se2 = va + vb;
    let diff = a.mean - b.mean;

    if se2 <= 0.0 {
        let dof = (a.n + b.n) as f64 - 2.0;
        return if diff == 0.0 {
            WelchTest {
                t_statistic: 0.0,
                p_value: 1.0,
                dof,
            }
        } else {
            WelchTest {
                t_statistic: diff.signum() * f64::INFINITY,
                p_value: 0.0,
                dof,
            }
        };
    }

    let t_statistic = diff / se2.sqrt();
    let dof = se2 * se2 / (va * va / (a.n as f64 - 1.0) + vb * vb / (b.n as f64 - 1.0));

    WelchTest {
        t_statistic,
        p_value: two_sided_p_value(t_statistic, dof),
        dof,
    }
}

fn two_sided_p_value(t: f64, dof: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, dof) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

//! Descriptive statistics and the D'Agostino-Pearson normality test.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Smallest sample the skewness z-transform is defined for.
pub const MIN_NORMALITY_SAMPLES: usize = 8;

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`).
pub fn population_variance(values: &[f64]) -> f64 {
    central_moment(values, mean(values), 2)
}

/// Unbiased sample variance (divides by `n - 1`); 0.0 for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Standard error of the mean: population standard deviation over `sqrt(n)`.
pub fn standard_error(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (population_variance(values) / values.len() as f64).sqrt()
}

fn central_moment(values: &[f64], center: f64, order: i32) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|x| (x - center).powi(order)).sum::<f64>() / values.len() as f64
}

/// D'Agostino-Pearson K² omnibus test for departure from normality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    /// K² = Z(skewness)² + Z(kurtosis)².
    pub statistic: f64,
    /// Upper tail of χ²(2) at `statistic`.
    pub p_value: f64,
    /// Normalized skewness z-score.
    pub skewness_z: f64,
    /// Normalized kurtosis z-score.
    pub kurtosis_z: f64,
}

/// Run the K² test on `values`.
///
/// Returns `None` when the sample has fewer than
/// [`MIN_NORMALITY_SAMPLES`] values or zero variance, where the moment
/// transforms are undefined.
pub fn normality_test(values: &[f64]) -> Option<NormalityTest> {
    let n = values.len();
    if n < MIN_NORMALITY_SAMPLES {
        return None;
    }

    let m = mean(values);
    let m2 = central_moment(values, m, 2);
    if m2 <= f64::EPSILON * m.abs().max(1.0) {
        return None;
    }
    let m3 = central_moment(values, m, 3);
    let m4 = central_moment(values, m, 4);

    let skewness_z = skewness_z(m3 / m2.powf(1.5), n as f64);
    let kurtosis_z = kurtosis_z(m4 / (m2 * m2), n as f64);
    let statistic = skewness_z * skewness_z + kurtosis_z * kurtosis_z;
    if !statistic.is_finite() {
        return None;
    }

    let p_value = ChiSquared::new(2.0).ok()?.sf(statistic);

    Some(NormalityTest {
        statistic,
        p_value,
        skewness_z,
        kurtosis_z,
    })
}

/// D'Agostino (1970) transform of sample skewness to a standard normal.
fn skewness_z(skewness: f64, n: f64) -> f64 {
    let mut y = skewness * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    let ratio = y / alpha;
    delta * (ratio + (ratio * ratio + 1.0).sqrt()).ln()
}

/// Anscombe-Glynn (1983) transform of sample kurtosis to a standard normal.
fn kurtosis_z(kurtosis: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (kurtosis - expected) / variance.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

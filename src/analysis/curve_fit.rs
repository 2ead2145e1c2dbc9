//! Weighted nonlinear least squares for the goodness-of-fit diagnostics.
//!
//! Two models are fitted:
//! - a three-parameter Gaussian to the histogram of resampled t statistics,
//!   measuring how well the classical normality assumption holds;
//! - a one-parameter Poisson pmf to each period's units-per-day distribution.
//!
//! Both use Levenberg-Marquardt with analytic Jacobians. Fit quality is the
//! coefficient of determination `R² = 1 - Var(residuals) / Var(data)`,
//! which is not clamped and goes negative for fits worse than a constant.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;
use thiserror::Error;

use crate::constants::{MAX_FIT_ITERATIONS, SQRT_2PI};
use crate::statistics::{population_variance, EmpiricalDistribution, Histogram};

/// Curve fit failures. These degrade the report instead of aborting it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// The optimizer ran out of iterations.
    #[error("{model} fit did not converge within {iterations} iterations")]
    NonConvergence {
        /// Model being fitted.
        model: &'static str,
        /// Iterations spent.
        iterations: usize,
    },

    /// The data cannot identify the model parameters.
    #[error("{model} fit has degenerate data: {reason}")]
    DegenerateData {
        /// Model being fitted.
        model: &'static str,
        /// What made the data unusable.
        reason: &'static str,
    },

    /// Data or parameters became NaN or infinite.
    #[error("{model} fit produced non-finite values")]
    NonFinite {
        /// Model being fitted.
        model: &'static str,
    },
}

/// Fitted Gaussian `A / sqrt(2π) · exp(-(x - μ)² / 2σ²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianFit {
    /// Amplitude `A`.
    pub amplitude: f64,
    /// Location `μ`.
    pub mean: f64,
    /// Scale `σ` (reported as its absolute value).
    pub std_dev: f64,
    /// Coefficient of determination, may be negative.
    pub r_squared: f64,
    /// Optimizer iterations used.
    pub iterations: usize,
}

/// Fitted Poisson pmf `e^{-λ} λ^k / k!`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoissonFit {
    /// Rate `λ` in units per day.
    pub lambda: f64,
    /// Coefficient of determination, may be negative.
    pub r_squared: f64,
    /// Optimizer iterations used.
    pub iterations: usize,
}

/// A parametric curve with an analytic gradient.
trait Model {
    const NAME: &'static str;

    fn value(&self, x: f64, params: &[f64]) -> f64;

    /// Partial derivatives of `value` with respect to each parameter.
    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]);
}

struct Gaussian;

impl Model for Gaussian {
    const NAME: &'static str = "gaussian";

    fn value(&self, x: f64, p: &[f64]) -> f64 {
        let z = (x - p[1]) / p[2];
        p[0] / SQRT_2PI * (-0.5 * z * z).exp()
    }

    fn gradient(&self, x: f64, p: &[f64], out: &mut [f64]) {
        let (amplitude, mu, sigma) = (p[0], p[1], p[2]);
        let d = x - mu;
        let shape = (-0.5 * d * d / (sigma * sigma)).exp() / SQRT_2PI;
        let f = amplitude * shape;
        out[0] = shape;
        out[1] = f * d / (sigma * sigma);
        out[2] = f * d * d / (sigma * sigma * sigma);
    }
}

struct Poisson;

impl Model for Poisson {
    const NAME: &'static str = "poisson";

    fn value(&self, k: f64, p: &[f64]) -> f64 {
        let lambda = p[0];
        if lambda <= 0.0 {
            return f64::NAN;
        }
        (-lambda + k * lambda.ln() - ln_gamma(k + 1.0)).exp()
    }

    fn gradient(&self, k: f64, p: &[f64], out: &mut [f64]) {
        let lambda = p[0];
        out[0] = self.value(k, p) * (k / lambda - 1.0);
    }
}

/// Fit a Gaussian to a histogram of resampled statistics.
///
/// The data are the bin masses (counts normalized to sum to one) located
/// at the bin centres. Starting values come from the moments of the
/// histogram: amplitude `sqrt(2π) · max(y)`, mean and standard deviation
/// weighted by the bin masses.
///
/// # Errors
///
/// `DegenerateData` when all mass falls in one bin (zero spread),
/// `NonConvergence` or `NonFinite` from the optimizer.
pub fn fit_gaussian(histogram: &Histogram) -> Result<GaussianFit, FitError> {
    let model = Gaussian::NAME;
    let x = histogram.centers();
    let y = histogram.mass();
    if y.iter().all(|&v| v == 0.0) {
        return Err(FitError::DegenerateData {
            model,
            reason: "histogram is empty",
        });
    }

    let peak = y.iter().copied().fold(0.0, f64::max);
    let mu: f64 = x.iter().zip(&y).map(|(x, y)| x * y).sum();
    let var: f64 = x.iter().zip(&y).map(|(x, y)| (x - mu).powi(2) * y).sum();
    let sigma = var.sqrt();
    if sigma.is_nan() || sigma <= 0.0 {
        return Err(FitError::DegenerateData {
            model,
            reason: "all resampled statistics fall in a single bin",
        });
    }

    let outcome = levenberg_marquardt(
        &Gaussian,
        &x,
        &y,
        None,
        vec![SQRT_2PI * peak, mu, sigma],
        MAX_FIT_ITERATIONS,
    )?;
    let params = &outcome.params;

    Ok(GaussianFit {
        amplitude: params[0],
        mean: params[1],
        std_dev: params[2].abs(),
        r_squared: r_squared(&Gaussian, &x, &y, params, model)?,
        iterations: outcome.iterations,
    })
}

/// Fit a Poisson pmf to a period's units-per-day distribution.
///
/// Weighted by the per-bin standard errors (zero errors floored), starting
/// at the rounded mean number of units per day.
///
/// # Errors
///
/// `DegenerateData` when the distribution has a single bin or no spread,
/// `NonConvergence` or `NonFinite` from the optimizer.
pub fn fit_poisson(dist: &EmpiricalDistribution) -> Result<PoissonFit, FitError> {
    let model = Poisson::NAME;
    let y = dist.pmf().to_vec();
    if y.len() < 2 || population_variance(&y) == 0.0 {
        return Err(FitError::DegenerateData {
            model,
            reason: "distribution has a single bin",
        });
    }

    let x: Vec<f64> = (0..y.len()).map(|k| k as f64).collect();
    let mean = dist.mean_units();
    // A rate of zero sits on the boundary of the parameter space.
    let start = if mean.round() > 0.0 { mean.round() } else { mean };
    if start.is_nan() || start <= 0.0 {
        return Err(FitError::DegenerateData {
            model,
            reason: "no units sold",
        });
    }

    let weights = dist.fit_weights();
    let outcome = levenberg_marquardt(
        &Poisson,
        &x,
        &y,
        Some(&weights),
        vec![start],
        MAX_FIT_ITERATIONS,
    )?;
    let params = &outcome.params;

    Ok(PoissonFit {
        lambda: params[0],
        r_squared: r_squared(&Poisson, &x, &y, params, model)?,
        iterations: outcome.iterations,
    })
}

fn r_squared<M: Model>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64],
    name: &'static str,
) -> Result<f64, FitError> {
    let residuals: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| yi - model.value(xi, params))
        .collect();
    let var_y = population_variance(y);
    if var_y == 0.0 {
        return Err(FitError::DegenerateData {
            model: name,
            reason: "data have zero variance",
        });
    }
    let r2 = 1.0 - population_variance(&residuals) / var_y;
    if r2.is_finite() {
        Ok(r2)
    } else {
        Err(FitError::NonFinite { model: name })
    }
}

struct FitOutcome {
    params: Vec<f64>,
    iterations: usize,
}

/// Weighted sum of squared residuals; non-finite for invalid parameters.
fn cost<M: Model>(model: &M, x: &[f64], y: &[f64], sigma: Option<&[f64]>, params: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .enumerate()
        .map(|(i, (&xi, &yi))| {
            let s = sigma.map_or(1.0, |s| s[i]);
            ((yi - model.value(xi, params)) / s).powi(2)
        })
        .sum()
}

/// Levenberg-Marquardt with Marquardt diagonal scaling.
///
/// Minimizes `Σ ((y_i - f(x_i; p)) / σ_i)²`. A rejected step raises the
/// damping tenfold; an accepted one lowers it tenfold. Converges when the
/// relative cost reduction or the relative step size becomes negligible,
/// or when no damping can reduce the cost any further. Gives up with
/// `NonConvergence` after `max_iterations`.
fn levenberg_marquardt<M: Model>(
    model: &M,
    x: &[f64],
    y: &[f64],
    sigma: Option<&[f64]>,
    start: Vec<f64>,
    max_iterations: usize,
) -> Result<FitOutcome, FitError> {
    const COST_TOLERANCE: f64 = 1e-12;
    const STEP_TOLERANCE: f64 = 1e-10;
    const MAX_DAMPING: f64 = 1e16;

    let name = M::NAME;
    let n = x.len();
    let m = start.len();
    if n <= m {
        return Err(FitError::DegenerateData {
            model: name,
            reason: "fewer data points than parameters",
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite())
        || sigma.is_some_and(|s| s.len() != n || s.iter().any(|v| !(v.is_finite() && *v > 0.0)))
    {
        return Err(FitError::NonFinite { model: name });
    }

    let mut params = start;
    let mut current = cost(model, x, y, sigma, &params);
    if !current.is_finite() {
        return Err(FitError::NonFinite { model: name });
    }

    let mut jacobian = DMatrix::<f64>::zeros(n, m);
    let mut residuals = DVector::<f64>::zeros(n);
    let mut gradient = vec![0.0; m];
    let mut damping = 1e-3;

    for iteration in 1..=max_iterations {
        if current == 0.0 {
            return Ok(FitOutcome {
                params,
                iterations: iteration - 1,
            });
        }

        for i in 0..n {
            let s = sigma.map_or(1.0, |s| s[i]);
            residuals[i] = (y[i] - model.value(x[i], &params)) / s;
            model.gradient(x[i], &params, &mut gradient);
            for (j, g) in gradient.iter().enumerate() {
                jacobian[(i, j)] = g / s;
            }
        }
        if jacobian.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { model: name });
        }

        let jt = jacobian.transpose();
        let normal = &jt * &jacobian;
        let rhs = &jt * &residuals;

        let mut damped = normal.clone();
        for k in 0..m {
            damped[(k, k)] += damping * normal[(k, k)].max(f64::EPSILON);
        }

        let step = match damped.cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => {
                damping *= 10.0;
                continue;
            }
        };

        let candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, d)| p + d).collect();
        let trial = cost(model, x, y, sigma, &candidate);

        if trial.is_finite() && trial < current {
            let reduction = (current - trial) / current;
            let param_norm: f64 = params.iter().map(|p| p * p).sum::<f64>().sqrt();
            let step_small = step.norm() <= STEP_TOLERANCE * (param_norm + STEP_TOLERANCE);

            params = candidate;
            current = trial;
            damping = (damping / 10.0).max(1e-12);

            if reduction <= COST_TOLERANCE || step_small {
                return Ok(FitOutcome {
                    params,
                    iterations: iteration,
                });
            }
        } else {
            damping *= 10.0;
            if damping > MAX_DAMPING {
                // No descent direction left: a (local) minimum.
                return Ok(FitOutcome {
                    params,
                    iterations: iteration,
                });
            }
        }
    }

    tracing::debug!(model = name, cost = current, "curve fit hit the iteration cap");
    Err(FitError::NonConvergence {
        model: name,
        iterations: max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn gaussian_histogram(mu: f64, sigma: f64, bins: usize) -> Histogram {
        // Deterministic sample: normal quantiles.
        use statrs::distribution::{ContinuousCDF, Normal};
        let normal = Normal::new(mu, sigma).unwrap();
        let values: Vec<f64> = (0..5000)
            .map(|i| normal.inverse_cdf((i as f64 + 0.5) / 5000.0))
            .collect();
        Histogram::new(&values, bins, Stage::Hypothesis).unwrap()
    }

    #[test]
    fn test_gaussian_fit_recovers_location_and_scale() {
        let hist = gaussian_histogram(1.5, 0.8, 20);
        let fit = fit_gaussian(&hist).unwrap();
        assert!((fit.mean - 1.5).abs() < 0.05, "mean {}", fit.mean);
        assert!((fit.std_dev - 0.8).abs() < 0.08, "sigma {}", fit.std_dev);
        assert!(fit.r_squared > 0.98, "r2 {}", fit.r_squared);
    }

    #[test]
    fn test_gaussian_fit_degenerate_histogram() {
        let hist = Histogram::new(&[0.0; 100], 20, Stage::Hypothesis).unwrap();
        let err = fit_gaussian(&hist).unwrap_err();
        assert!(matches!(err, FitError::DegenerateData { model: "gaussian", .. }));
    }

    #[test]
    fn test_r_squared_is_negative_for_bad_parameters() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| Gaussian.value(xi, &[2.0, 4.5, 1.5])).collect();
        // A tall narrow bell at the wrong location fits worse than a constant.
        let r2 = r_squared(&Gaussian, &x, &y, &[50.0, 0.0, 0.5], "gaussian").unwrap();
        assert!(r2 < 0.0, "r2 {r2}");
    }

    #[test]
    fn test_iteration_cap_is_non_convergence() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| Gaussian.value(xi, &[2.0, 4.5, 1.5])).collect();
        let err = levenberg_marquardt(&Gaussian, &x, &y, None, vec![1.0, 3.0, 1.0], 1)
            .err()
            .unwrap();
        assert_eq!(
            err,
            FitError::NonConvergence {
                model: "gaussian",
                iterations: 1
            }
        );
    }

    #[test]
    fn test_poisson_fit_recovers_rate() {
        let lambda: f64 = 3.0;
        // Day counts proportional to the Poisson pmf over 0..=10.
        let mut units = Vec::new();
        for k in 0..=10u32 {
            let p = (-lambda + k as f64 * lambda.ln() - ln_gamma(k as f64 + 1.0)).exp();
            let days = (p * 10_000.0).round() as usize;
            units.extend(std::iter::repeat(k).take(days));
        }
        let dist = EmpiricalDistribution::estimate(&units).unwrap();
        let fit = fit_poisson(&dist).unwrap();
        assert!((fit.lambda - 3.0).abs() < 0.01, "lambda {}", fit.lambda);
        assert!(fit.r_squared > 0.999);
    }

    #[test]
    fn test_poisson_fit_single_bin_is_degenerate() {
        let dist = EmpiricalDistribution::estimate(&[1, 1, 1]).unwrap();
        let err = fit_poisson(&dist).unwrap_err();
        assert!(matches!(err, FitError::DegenerateData { model: "poisson", .. }));
    }

    #[test]
    fn test_poisson_fit_low_rate_starts_off_boundary() {
        let mut units = vec![0u32; 90];
        units.extend([1; 9]);
        units.push(2);
        let dist = EmpiricalDistribution::estimate(&units).unwrap();
        let fit = fit_poisson(&dist).unwrap();
        assert!(fit.lambda > 0.0 && fit.lambda < 0.3, "lambda {}", fit.lambda);
    }

    #[test]
    fn test_exact_model_converges_immediately() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let p = [2.0, 4.5, 1.5];
        let y: Vec<f64> = x.iter().map(|&xi| Gaussian.value(xi, &p)).collect();
        let outcome =
            levenberg_marquardt(&Gaussian, &x, &y, None, p.to_vec(), MAX_FIT_ITERATIONS).unwrap();
        assert_eq!(outcome.params, p.to_vec());
    }

    #[test]
    fn test_non_finite_data_rejected() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.1, f64::NAN, 0.2, 0.1];
        let err = levenberg_marquardt(&Gaussian, &x, &y, None, vec![1.0, 1.0, 1.0], 10)
            .err()
            .unwrap();
        assert_eq!(err, FitError::NonFinite { model: "gaussian" });
    }
}

//! Statistical building blocks.
//!
//! This module provides the estimation and sampling layer the analyses
//! are built on:
//! - Unit price inference and dollar-to-unit conversion
//! - Empirical distributions of units sold per day
//! - Distribution perturbation and inverse-CDF sampling with per-trial seeding
//! - Histograms, loss fractions and empirical p-values
//! - Descriptive statistics, quantiles and a normality test

mod descriptive;
mod empirical;
mod histogram;
mod quantile;
mod sampling;
mod units;

pub use descriptive::{
    mean, normality_test, population_variance, sample_variance, standard_error, NormalityTest,
    MIN_NORMALITY_SAMPLES,
};
pub use empirical::{CumulativeDistribution, EmpiricalDistribution};
pub use histogram::{compute_loss_fraction, Histogram};
pub use quantile::{compute_percentiles, compute_quantile_sorted, profit_percentiles};
pub use sampling::{counter_rng_seed, inverse_cdf, perturb, sample, sample_into};
pub use units::{amounts_to_units, check_price_divides, check_unit_price, infer_unit_price};

//! Shared constants for the evaluation pipeline.

/// Days per calendar year used when annualizing average daily sales.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Number of days drawn for one simulated projection year.
pub const SIMULATED_DAYS_PER_YEAR: usize = 365;

/// Default number of Monte Carlo trials per stage.
pub const DEFAULT_NUMBER_SIMS: usize = 1000;

/// Default histogram bin count for every reported distribution.
pub const DEFAULT_BINS: usize = 20;

/// Default significance threshold for the null-hypothesis decision.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default random seed.
pub const DEFAULT_SEED: u64 = 113;

/// Default annual advertising expense ($500 per month).
pub const DEFAULT_ANNUAL_ADV_EXPENSE: f64 = 500.0 * 12.0;

/// Default moving-average window in days.
pub const DEFAULT_MOVING_AVERAGE_DAYS: usize = 30;

/// Floor applied to zero standard errors before they are used as fit weights.
pub const STD_ERROR_FLOOR: f64 = 0.01;

/// An inferred unit price of exactly one cent signals mixed prices.
pub const CENT: f64 = 0.01;

/// `sqrt(2π)`, the Gaussian normalization constant.
pub const SQRT_2PI: f64 = 2.506_628_274_631_000_5;

/// Probabilities reported in the annual profit summary.
pub const PROFIT_PERCENTILES: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

/// Iteration cap for the Levenberg-Marquardt curve fits.
pub const MAX_FIT_ITERATIONS: usize = 200;

/// Minimum interval between forwarded progress notifications.
pub const PROGRESS_INTERVAL_SECS: f64 = 1.0;

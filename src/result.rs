//! Evaluation result types.
//!
//! Every record is plain data (scalars, arrays and histograms) so a
//! presentation layer can render or serialize it without further
//! statistical computation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{GaussianFit, NullDistribution, PoissonFit, WelchTest};
use crate::statistics::{EmpiricalDistribution, Histogram, NormalityTest};

/// Complete result of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Hypothesis test and per-period statistics.
    pub statistics: SalesStatistics,

    /// Annual projection simulation.
    pub projection: ProjectionResult,

    /// Run parameters and provenance.
    pub metadata: Metadata,

    /// Human-readable notes about degraded diagnostics (empty if none).
    pub warnings: Vec<String>,
}

impl EvaluationReport {
    /// Whether the empirical test rejects "nothing changed" at `alpha`.
    pub fn is_significant(&self) -> bool {
        self.statistics.reject_null
    }

    /// Simulated probability that continuing to advertise loses money.
    pub fn loss_probability(&self) -> f64 {
        self.projection.profit_increase.loss_fraction
    }

    /// Mean simulated annual profit change from advertising.
    pub fn expected_profit_increase(&self) -> f64 {
        self.statistics.expected_profit_increase
    }
}

/// Statistics computed from the observed periods and the resampling null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesStatistics {
    /// Days before the campaign start.
    pub no_adv: PeriodSummary,

    /// Days on or after the campaign start.
    pub adv: PeriodSummary,

    /// Welch's test of no-advertising vs advertising daily sales.
    pub welch: WelchTest,

    /// Resampled null distribution of the t statistic (and its p-values).
    pub null_distribution: NullDistribution,

    /// Two-sided p-value of the observed t against the resampled null.
    pub empirical_p_value: f64,

    /// Gaussian fitted to the null histogram; `None` if the fit failed.
    pub gaussian_fit: Option<GaussianFit>,

    /// R² of the Gaussian fit. Unclamped; negative values mean the bell
    /// curve describes the null worse than a constant.
    pub coefficient_of_determination: Option<f64>,

    /// Significance threshold used for the decisions below.
    pub alpha: f64,

    /// `empirical_p_value < alpha`.
    pub reject_null: bool,

    /// `welch.p_value < alpha`.
    pub reject_null_classical: bool,

    /// Mean simulated annual profit change, after advertising and unit costs.
    pub expected_profit_increase: f64,
}

/// Summary of one period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Number of days.
    pub days: usize,

    /// Mean daily sales in dollars.
    pub mean_daily_sales: f64,

    /// Standard error of the mean daily sales.
    pub std_error_daily_sales: f64,

    /// Mean units sold per day.
    pub mean_units_per_day: f64,

    /// Empirical distribution of units sold per day.
    pub distribution: EmpiricalDistribution,

    /// Normality test of daily sales; `None` below eight days or for
    /// constant sales.
    pub normality: Option<NormalityTest>,

    /// Normality test of the moving-average daily sales.
    pub moving_average_normality: Option<NormalityTest>,

    /// Poisson model of units per day; `None` if the fit failed.
    pub poisson_fit: Option<PoissonFit>,
}

/// Per-trial outcomes of the annual projection and their distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Simulated average daily sales with advertising, per trial.
    pub ave_daily_sales_adv: Vec<f64>,

    /// Simulated average daily sales without advertising, per trial.
    pub ave_daily_sales_no_adv: Vec<f64>,

    /// Independent second no-advertising draw (calibration arm), per trial.
    pub ave_daily_sales_control: Vec<f64>,

    /// Histogram of annual sales without advertising.
    pub annual_sales_no_adv: Histogram,

    /// Histogram of annual sales with advertising.
    pub annual_sales_adv: Histogram,

    /// Annual sales change from advertising.
    pub sales_increase: DeltaDistribution,

    /// Annual profit change from advertising (net of expense and unit cost).
    pub profit_increase: DeltaDistribution,

    /// Average daily sales change from advertising.
    pub daily_sales_increase: DeltaDistribution,

    /// Annual sales change between the two no-advertising draws.
    pub control_sales_increase: DeltaDistribution,

    /// Annual profit change between the two no-advertising draws (no
    /// advertising expense). Its spread is the simulation noise floor.
    pub control_profit_increase: DeltaDistribution,

    /// Location and spread of `profit_increase`.
    pub profit_summary: DistributionSummary,

    /// Overlap mass of the with/without average daily sales densities
    /// (1.0 for identical, 0.0 for disjoint distributions).
    pub sales_overlap: f64,
}

/// A simulated change with its histogram and loss fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaDistribution {
    /// Per-trial values.
    pub values: Vec<f64>,

    /// Histogram of `values`.
    pub histogram: Histogram,

    /// Interpolated fraction of simulated mass below zero.
    pub loss_fraction: f64,

    /// Mean of `values`.
    pub mean: f64,
}

/// Location and spread of a simulated distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Mean.
    pub mean: f64,

    /// Population standard deviation.
    pub std_dev: f64,

    /// Smallest value.
    pub min: f64,

    /// Largest value.
    pub max: f64,

    /// Selected percentiles.
    pub percentiles: Vec<Percentile>,
}

/// One percentile of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    /// Probability in `[0, 1]`.
    pub probability: f64,

    /// Value at that probability.
    pub value: f64,
}

/// Run parameters and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Caller-supplied name of the input (file name, ledger id).
    pub input_identity: Option<String>,

    /// First day of the series.
    pub first_day: NaiveDate,

    /// Last day of the series.
    pub last_day: NaiveDate,

    /// Campaign start date.
    pub start_date: NaiveDate,

    /// Dollars per unit.
    pub unit_price: f64,

    /// True if `unit_price` was inferred from the data.
    pub unit_price_inferred: bool,

    /// Marginal cost per unit.
    pub unit_cost: f64,

    /// Fixed annual advertising expense.
    pub annual_adv_expense: f64,

    /// Trials per simulation stage.
    pub number_sims: usize,

    /// Root random seed.
    pub seed: u64,

    /// Histogram bin count.
    pub bins: usize,

    /// When the report was produced.
    pub generated_at: DateTime<Utc>,

    /// Total runtime in seconds.
    pub runtime_secs: f64,

    /// Version of this library.
    pub version: String,
}

//! Main `AdEvaluator` entry point and builder.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;

use crate::analysis::{simulate, simulate_null, welch_t_test, NullInput, ProjectionInput};
use crate::config::EvaluationConfig;
use crate::error::EvalResult;
use crate::progress::{ProgressSink, ProgressStage, ThrottledProgress};
use crate::report::{metadata, HypothesisOutcome, ReportAssembler};
use crate::result::EvaluationReport;
use crate::series::{DailySalesSeries, PeriodMask};
use crate::statistics::{
    amounts_to_units, check_price_divides, counter_rng_seed, infer_unit_price, EmpiricalDistribution,
};
use crate::types::Period;

/// Seed counter of the resampling null stage.
const NULL_STAGE: u64 = 0;
/// Seed counter of the projection stage.
const PROJECTION_STAGE: u64 = 1;

/// Main entry point for advertising evaluation.
///
/// Use the builder pattern to configure and run an evaluation.
///
/// # Example
///
/// ```ignore
/// use ad_rater::{AdEvaluator, DailySalesSeries};
///
/// let series = DailySalesSeries::from_transactions(&rows, Some("Sales Receipt"))?;
/// let report = AdEvaluator::new(campaign_start)
///     .unit_cost(4.0)
///     .number_sims(2_000)
///     .evaluate(&series)?;
///
/// println!("p = {:.3}", report.statistics.empirical_p_value);
/// println!("P(loss) = {:.1}%", report.loss_probability() * 100.0);
/// ```
#[derive(Clone)]
pub struct AdEvaluator {
    config: EvaluationConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl fmt::Debug for AdEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdEvaluator")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl AdEvaluator {
    /// Create with default configuration for a campaign starting on `start_date`.
    pub fn new(start_date: NaiveDate) -> Self {
        Self::with_config(EvaluationConfig::new(start_date))
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: EvaluationConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Create with fast configuration for tests.
    ///
    /// Settings:
    /// - 200 simulations per stage (vs 1,000 default)
    pub fn quick(start_date: NaiveDate) -> Self {
        Self::with_config(EvaluationConfig {
            number_sims: 200,
            ..EvaluationConfig::new(start_date)
        })
    }

    /// Set the unit price instead of inferring it.
    pub fn unit_price(mut self, price: f64) -> Self {
        self.config.unit_price = Some(price);
        self
    }

    /// Set the marginal cost per unit.
    pub fn unit_cost(mut self, cost: f64) -> Self {
        self.config.unit_cost = cost;
        self
    }

    /// Set the number of simulations per stage.
    pub fn number_sims(mut self, n: usize) -> Self {
        self.config.number_sims = n;
        self
    }

    /// Set the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the histogram bin count.
    pub fn bins(mut self, bins: usize) -> Self {
        self.config.bins = bins;
        self
    }

    /// Set the significance threshold.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Set the fixed annual advertising expense.
    pub fn annual_adv_expense(mut self, expense: f64) -> Self {
        self.config.annual_adv_expense = expense;
        self
    }

    /// Set the moving-average window in days.
    pub fn moving_average_days(mut self, days: usize) -> Self {
        self.config.moving_average_days = days;
        self
    }

    /// Name the input in the report metadata.
    pub fn input_identity(mut self, identity: impl Into<String>) -> Self {
        self.config.input_identity = Some(identity.into());
        self
    }

    /// Observe trial progress of the two simulation stages.
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Apply `ADRATER_*` environment overrides to the current configuration.
    pub fn with_env_overrides(mut self) -> Self {
        self.config = self.config.with_env_overrides();
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Run the full evaluation.
    ///
    /// # How It Works
    ///
    /// 1. Validates every parameter and splits the series at the start date
    /// 2. Infers (or checks) the unit price and estimates each period's
    ///    units-per-day distribution
    /// 3. Runs Welch's test and the resampling null, then fits a Gaussian
    ///    to the null
    /// 4. Simulates annual sales and profit with and without advertising
    /// 5. Assembles the report
    ///
    /// # Errors
    ///
    /// Any [`EvalError`](crate::EvalError) except curve-fit failures, which
    /// degrade the report instead.
    pub fn evaluate(self, series: &DailySalesSeries) -> EvalResult<EvaluationReport> {
        let start_time = Instant::now();
        let config = self.config;
        let sink = self.progress.as_deref();

        // Step 1: Validate before any simulation work
        config.validate()?;
        let mask = PeriodMask::split(series, config.start_date)?;
        let amounts = series.amounts();
        let no_adv_amounts = mask.select(&amounts, Period::NoAdvertising);
        let adv_amounts = mask.select(&amounts, Period::Advertising);

        tracing::info!(
            days = series.len(),
            no_adv_days = no_adv_amounts.len(),
            adv_days = adv_amounts.len(),
            start_date = %config.start_date,
            "starting evaluation"
        );

        // Step 2: Unit price and per-period distributions
        let (unit_price, unit_price_inferred) = match config.unit_price {
            Some(price) => {
                check_price_divides(&amounts, price)?;
                (price, false)
            }
            None => (infer_unit_price(&amounts)?, true),
        };
        tracing::debug!(unit_price, inferred = unit_price_inferred, "unit price");

        let no_adv = EmpiricalDistribution::estimate(&amounts_to_units(&no_adv_amounts, unit_price))?;
        let adv = EmpiricalDistribution::estimate(&amounts_to_units(&adv_amounts, unit_price))?;
        let no_adv_cdf = no_adv.cumulative();
        let adv_cdf = adv.cumulative();
        tracing::debug!(
            no_adv_support = no_adv.len(),
            adv_support = adv.len(),
            "estimated units-per-day distributions"
        );

        // Step 3: Classical test, resampling null, Gaussian diagnostic
        let welch = welch_t_test(&no_adv_amounts, &adv_amounts)?;
        tracing::info!(
            t = welch.t_statistic,
            p = welch.p_value,
            dof = welch.dof,
            "Welch's t-test"
        );

        let null_progress =
            ThrottledProgress::new(sink, ProgressStage::NullDistribution, config.number_sims);
        let null_distribution = simulate_null(
            &NullInput {
                observed_no_adv: &no_adv_amounts,
                no_adv: &no_adv_cdf,
                adv_days: adv_amounts.len(),
                unit_price,
                number_sims: config.number_sims,
                bins: config.bins,
                seed: counter_rng_seed(config.seed, NULL_STAGE),
            },
            &null_progress,
        )?;
        tracing::info!(
            empirical_p = null_distribution.empirical_p_value(welch.t_statistic),
            "resampling null complete"
        );

        let mut assembler = ReportAssembler::new();
        let gaussian_fit = assembler.gaussian(&null_distribution);

        // Step 4: Annual projection
        let projection_progress =
            ThrottledProgress::new(sink, ProgressStage::Projection, config.number_sims);
        let projection = simulate(
            &ProjectionInput {
                no_adv_cdf: &no_adv_cdf,
                no_adv_std_error: no_adv.std_error(),
                adv_cdf: &adv_cdf,
                adv_std_error: adv.std_error(),
                unit_price,
                unit_cost: config.unit_cost,
                annual_adv_expense: config.annual_adv_expense,
                number_sims: config.number_sims,
                bins: config.bins,
                seed: counter_rng_seed(config.seed, PROJECTION_STAGE),
            },
            &projection_progress,
        )?;
        tracing::info!(
            expected_profit_increase = projection.profit_increase.mean,
            loss_fraction = projection.profit_increase.loss_fraction,
            "projection complete"
        );

        // Step 5: Report
        let no_adv_summary = assembler.period(
            Period::NoAdvertising,
            &no_adv_amounts,
            no_adv,
            config.moving_average_days,
        );
        let adv_summary =
            assembler.period(Period::Advertising, &adv_amounts, adv, config.moving_average_days);
        let statistics = assembler.statistics(
            no_adv_summary,
            adv_summary,
            HypothesisOutcome {
                welch,
                null_distribution,
                gaussian_fit,
            },
            config.alpha,
            &projection,
        );

        let runtime_secs = start_time.elapsed().as_secs_f64();
        let metadata = metadata(&config, series, unit_price, unit_price_inferred, runtime_secs);
        tracing::info!(
            runtime_secs,
            reject_null = statistics.reject_null,
            warnings = assembler.warnings().len(),
            "evaluation complete"
        );

        Ok(assembler.finish(statistics, projection, metadata))
    }
}

//! Annual projection of sales and profit under distribution uncertainty.
//!
//! Each trial simulates one year three times: with advertising, without
//! advertising, and a second independent year without advertising. Every
//! arm samples from its own freshly perturbed distribution, so a trial
//! carries both parameter and sampling uncertainty. The two
//! no-advertising arms compared against each other form the control: the
//! spread of that difference is the noise floor a real advertising effect
//! has to rise above.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::constants::{DAYS_PER_YEAR, PROFIT_PERCENTILES, SIMULATED_DAYS_PER_YEAR};
use crate::error::{EvalError, EvalResult, Stage};
use crate::progress::ThrottledProgress;
use crate::result::{DeltaDistribution, DistributionSummary, Percentile, ProjectionResult};
use crate::statistics::{
    check_unit_price, counter_rng_seed, mean, perturb, population_variance, profit_percentiles,
    sample_into, CumulativeDistribution, Histogram,
};
use crate::thread_pool::{run_trials, run_trials_serial};

/// Inputs to the projection simulation.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    /// Units-per-day distribution without advertising.
    pub no_adv_cdf: &'a CumulativeDistribution,
    /// Per-bin standard error of the no-advertising distribution.
    pub no_adv_std_error: &'a [f64],
    /// Units-per-day distribution with advertising.
    pub adv_cdf: &'a CumulativeDistribution,
    /// Per-bin standard error of the advertising distribution.
    pub adv_std_error: &'a [f64],
    /// Dollars per unit.
    pub unit_price: f64,
    /// Marginal cost per unit sold.
    pub unit_cost: f64,
    /// Fixed annual cost of advertising.
    pub annual_adv_expense: f64,
    /// Number of simulated years.
    pub number_sims: usize,
    /// Histogram bin count.
    pub bins: usize,
    /// Seed for this stage; trial `i` uses `counter_rng_seed(seed, i)`.
    pub seed: u64,
}

impl ProjectionInput<'_> {
    /// Validate every parameter before any trial runs.
    fn validate(&self) -> EvalResult<()> {
        check_unit_price(self.unit_price)?;
        if !self.unit_cost.is_finite() || self.unit_cost < 0.0 {
            return Err(EvalError::parameter(
                "unit_cost",
                self.unit_cost,
                "must be finite and non-negative",
            ));
        }
        if !self.annual_adv_expense.is_finite() {
            return Err(EvalError::parameter(
                "annual_adv_expense",
                self.annual_adv_expense,
                "must be finite",
            ));
        }
        if self.number_sims == 0 {
            return Err(EvalError::parameter("number_sims", 0.0, "must be greater than zero"));
        }
        if self.bins == 0 {
            return Err(EvalError::parameter("bins", 0.0, "must be greater than zero"));
        }
        if self.no_adv_cdf.is_empty() || self.adv_cdf.is_empty() {
            return Err(EvalError::input(
                Stage::Projection,
                "cannot project from an empty distribution",
            ));
        }
        Ok(())
    }

    /// Annual profit change for a given change in average daily sales.
    fn profit(&self, daily_sales_delta: f64, ad_expense: f64) -> f64 {
        let annual_sales = DAYS_PER_YEAR * daily_sales_delta;
        let annual_units = annual_sales / self.unit_price;
        annual_sales - ad_expense - self.unit_cost * annual_units
    }
}

/// Average daily sales of the three arms in one simulated year.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TrialOutcome {
    adv: f64,
    no_adv: f64,
    control: f64,
}

struct Scratch {
    units: Vec<u32>,
}

/// Run the projection simulation.
///
/// # Errors
///
/// - `Parameter` for an invalid price, cost, expense, trial count or bin
///   count, before any trial runs.
/// - `Simulation` if a standard-error array does not match its distribution.
pub fn simulate(
    input: &ProjectionInput<'_>,
    progress: &ThrottledProgress<'_>,
) -> EvalResult<ProjectionResult> {
    input.validate()?;
    let outcomes = run(input, progress, false)?;
    summarize(input, &outcomes)
}

fn run(
    input: &ProjectionInput<'_>,
    progress: &ThrottledProgress<'_>,
    serial: bool,
) -> EvalResult<Vec<TrialOutcome>> {
    let init = || Scratch {
        units: vec![0u32; SIMULATED_DAYS_PER_YEAR],
    };
    let trial = |scratch: &mut Scratch, index: usize, slot: &mut TrialOutcome| -> EvalResult<()> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(input.seed, index as u64));

        let adv_cdf = perturb(input.adv_cdf, input.adv_std_error, &mut rng)?;
        let adv = simulate_year(&adv_cdf, input.unit_price, &mut scratch.units, &mut rng);

        let no_adv_cdf = perturb(input.no_adv_cdf, input.no_adv_std_error, &mut rng)?;
        let no_adv = simulate_year(&no_adv_cdf, input.unit_price, &mut scratch.units, &mut rng);

        // Separately perturbed: the control arm must not share the
        // no-advertising arm's distribution.
        let control_cdf = perturb(input.no_adv_cdf, input.no_adv_std_error, &mut rng)?;
        let control = simulate_year(&control_cdf, input.unit_price, &mut scratch.units, &mut rng);

        *slot = TrialOutcome {
            adv,
            no_adv,
            control,
        };
        progress.tick();
        Ok(())
    };

    let mut outcomes = vec![TrialOutcome::default(); input.number_sims];
    if serial {
        run_trials_serial(&mut outcomes, &init, &trial)?;
    } else {
        run_trials(&mut outcomes, &init, &trial)?;
    }
    progress.finish();
    Ok(outcomes)
}

/// Average daily sales in dollars over one simulated year.
fn simulate_year(
    cdf: &CumulativeDistribution,
    unit_price: f64,
    units: &mut [u32],
    rng: &mut Xoshiro256PlusPlus,
) -> f64 {
    sample_into(cdf, units, rng);
    let total: u64 = units.iter().map(|&u| u64::from(u)).sum();
    unit_price * total as f64 / units.len() as f64
}

fn summarize(input: &ProjectionInput<'_>, outcomes: &[TrialOutcome]) -> EvalResult<ProjectionResult> {
    let bins = input.bins;
    let ave_daily_sales_adv: Vec<f64> = outcomes.iter().map(|o| o.adv).collect();
    let ave_daily_sales_no_adv: Vec<f64> = outcomes.iter().map(|o| o.no_adv).collect();
    let ave_daily_sales_control: Vec<f64> = outcomes.iter().map(|o| o.control).collect();

    let daily_delta: Vec<f64> = outcomes.iter().map(|o| o.adv - o.no_adv).collect();
    let control_daily_delta: Vec<f64> = outcomes.iter().map(|o| o.control - o.no_adv).collect();

    let annual = |values: &[f64]| -> Vec<f64> { values.iter().map(|v| DAYS_PER_YEAR * v).collect() };

    let profit: Vec<f64> = daily_delta
        .iter()
        .map(|&d| input.profit(d, input.annual_adv_expense))
        .collect();
    let control_profit: Vec<f64> = control_daily_delta
        .iter()
        .map(|&d| input.profit(d, 0.0))
        .collect();

    let annual_sales_no_adv = Histogram::new(&annual(&ave_daily_sales_no_adv), bins, Stage::Projection)?;
    let annual_sales_adv = Histogram::new(&annual(&ave_daily_sales_adv), bins, Stage::Projection)?;

    let profit_summary = summarize_distribution(&profit);
    let sales_overlap = overlap(&ave_daily_sales_adv, &ave_daily_sales_no_adv, bins)?;

    let result = ProjectionResult {
        sales_increase: delta(annual(&daily_delta), bins)?,
        profit_increase: delta(profit, bins)?,
        daily_sales_increase: delta(daily_delta, bins)?,
        control_sales_increase: delta(annual(&control_daily_delta), bins)?,
        control_profit_increase: delta(control_profit, bins)?,
        ave_daily_sales_adv,
        ave_daily_sales_no_adv,
        ave_daily_sales_control,
        annual_sales_no_adv,
        annual_sales_adv,
        profit_summary,
        sales_overlap,
    };

    tracing::debug!(
        expected_sales_increase = result.sales_increase.mean,
        expected_profit_increase = result.profit_increase.mean,
        loss_fraction = result.profit_increase.loss_fraction,
        control_loss_fraction = result.control_profit_increase.loss_fraction,
        "projection summary"
    );

    Ok(result)
}

fn delta(values: Vec<f64>, bins: usize) -> EvalResult<DeltaDistribution> {
    let histogram = Histogram::new(&values, bins, Stage::Projection)?;
    Ok(DeltaDistribution {
        loss_fraction: histogram.loss_fraction(0.0),
        mean: mean(&values),
        histogram,
        values,
    })
}

fn summarize_distribution(values: &[f64]) -> DistributionSummary {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let percentiles = PROFIT_PERCENTILES
        .iter()
        .zip(profit_percentiles(values))
        .map(|(&probability, value)| Percentile { probability, value })
        .collect();

    DistributionSummary {
        mean: mean(values),
        std_dev: population_variance(values).sqrt(),
        min,
        max,
        percentiles,
    }
}

/// Overlap mass of two samples' densities over the shared range `[0, max]`.
fn overlap(a: &[f64], b: &[f64], bins: usize) -> EvalResult<f64> {
    let hi = a.iter().chain(b).copied().fold(0.0, f64::max);
    let ha = Histogram::with_range(a, bins, 0.0, hi, Stage::Projection)?;
    let hb = Histogram::with_range(b, bins, 0.0, hi, Stage::Projection)?;
    Ok(ha.mass().iter().zip(hb.mass()).map(|(pa, pb)| pa * pb).sum())
}

//! Resampling null distribution of Welch's t statistic.
//!
//! Under the null hypothesis nothing changed when advertising started, so
//! the advertising period should look like a fresh draw from the
//! no-advertising distribution. Each trial draws an advertising-sized
//! synthetic sample from that distribution (in units, scaled by the unit
//! price) and recomputes Welch's t against the observed no-advertising
//! days. The histogram of those statistics is the empirical null the
//! observed t is judged against, without assuming it is Gaussian.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::analysis::welch::{welch_from_summaries, SampleSummary, WelchTest};
use crate::error::{EvalError, EvalResult, Stage};
use crate::progress::ThrottledProgress;
use crate::statistics::{counter_rng_seed, sample_into, CumulativeDistribution, Histogram};
use crate::thread_pool::{run_trials, run_trials_serial};

/// Inputs to the resampling simulation.
#[derive(Debug, Clone, Copy)]
pub struct NullInput<'a> {
    /// Observed daily amounts of the no-advertising period.
    pub observed_no_adv: &'a [f64],
    /// Units-per-day distribution of the no-advertising period.
    pub no_adv: &'a CumulativeDistribution,
    /// Length of the synthetic advertising period in days.
    pub adv_days: usize,
    /// Dollars per unit.
    pub unit_price: f64,
    /// Number of resampling trials.
    pub number_sims: usize,
    /// Histogram bin count.
    pub bins: usize,
    /// Seed for this stage; trial `i` uses `counter_rng_seed(seed, i)`.
    pub seed: u64,
}

/// Empirical distribution of Welch's statistics under the null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullDistribution {
    /// t statistic of every trial, indexed by trial.
    pub t_statistics: Vec<f64>,
    /// Classical p-value of every trial, indexed by trial.
    pub p_values: Vec<f64>,
    /// Histogram of `t_statistics`.
    pub t_histogram: Histogram,
    /// Histogram of `p_values` over `[0, 1]`.
    pub p_histogram: Histogram,
}

impl NullDistribution {
    /// Two-sided empirical p-value of an observed t statistic.
    pub fn empirical_p_value(&self, observed_t: f64) -> f64 {
        self.t_histogram.empirical_p_value(observed_t)
    }
}

/// Build the resampling null distribution.
///
/// # Errors
///
/// - `Parameter` if `number_sims` or `adv_days` is too small.
/// - `InputData` if the observed period has fewer than two days.
/// - `Simulation` if any trial yields a non-finite statistic; the run is
///   aborted rather than biased by dropping the trial.
pub fn simulate_null(
    input: &NullInput<'_>,
    progress: &ThrottledProgress<'_>,
) -> EvalResult<NullDistribution> {
    let tests = run(input, progress, false)?;
    assemble(input, tests)
}

fn run(
    input: &NullInput<'_>,
    progress: &ThrottledProgress<'_>,
    serial: bool,
) -> EvalResult<Vec<WelchTest>> {
    if input.number_sims == 0 {
        return Err(EvalError::parameter(
            "number_sims",
            0.0,
            "must be greater than zero",
        ));
    }
    if input.adv_days < 2 {
        return Err(EvalError::input(
            Stage::Hypothesis,
            format!(
                "advertising period has {} day(s); at least two are needed",
                input.adv_days
            ),
        ));
    }

    let observed = SampleSummary::of(input.observed_no_adv)?;
    let adv_days = input.adv_days;

    let init = || vec![0u32; adv_days];
    let trial = |units: &mut Vec<u32>, index: usize, slot: &mut WelchTest| -> EvalResult<()> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(input.seed, index as u64));
        sample_into(input.no_adv, units, &mut rng);
        let synthetic = SampleSummary::of_units(units, input.unit_price);

        let test = welch_from_summaries(&observed, &synthetic);
        if !test.t_statistic.is_finite() || test.p_value.is_nan() {
            return Err(EvalError::simulation(
                Stage::Hypothesis,
                format!(
                    "trial {index} produced t = {}; observed amounts are not multiples of the unit price",
                    test.t_statistic
                ),
            ));
        }
        *slot = test;
        progress.tick();
        Ok(())
    };

    let empty = WelchTest {
        t_statistic: 0.0,
        p_value: 1.0,
        dof: 0.0,
    };
    let mut tests = vec![empty; input.number_sims];
    if serial {
        run_trials_serial(&mut tests, &init, &trial)?;
    } else {
        run_trials(&mut tests, &init, &trial)?;
    }
    progress.finish();

    Ok(tests)
}

fn assemble(input: &NullInput<'_>, tests: Vec<WelchTest>) -> EvalResult<NullDistribution> {
    let t_statistics: Vec<f64> = tests.iter().map(|t| t.t_statistic).collect();
    let p_values: Vec<f64> = tests.iter().map(|t| t.p_value).collect();

    let t_histogram = Histogram::new(&t_statistics, input.bins, Stage::Hypothesis)?;
    let p_histogram = Histogram::with_range(&p_values, input.bins, 0.0, 1.0, Stage::Hypothesis)?;

    tracing::debug!(
        trials = t_statistics.len(),
        t_min = t_histogram.edges[0],
        t_max = t_histogram.edges[t_histogram.bins()],
        "resampled null distribution"
    );

    Ok(NullDistribution {
        t_statistics,
        p_values,
        t_histogram,
        p_histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStage;
    use crate::statistics::{amounts_to_units, EmpiricalDistribution};

    fn observed() -> Vec<f64> {
        (0..40).map(|i| ((i * 7) % 5) as f64 * 10.0).collect()
    }

    fn input<'a>(observed: &'a [f64], cdf: &'a CumulativeDistribution) -> NullInput<'a> {
        NullInput {
            observed_no_adv: observed,
            no_adv: cdf,
            adv_days: 30,
            unit_price: 10.0,
            number_sims: 300,
            bins: 20,
            seed: 113,
        }
    }

    fn cdf_of(observed: &[f64]) -> CumulativeDistribution {
        EmpiricalDistribution::estimate(&amounts_to_units(observed, 10.0))
            .unwrap()
            .cumulative()
    }

    #[test]
    fn test_null_centred_near_zero() {
        let obs = observed();
        let cdf = cdf_of(&obs);
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 300);
        let null = simulate_null(&input(&obs, &cdf), &progress).unwrap();

        assert_eq!(null.t_statistics.len(), 300);
        assert_eq!(progress.completed(), 300);
        let mean_t = null.t_statistics.iter().sum::<f64>() / 300.0;
        assert!(mean_t.abs() < 0.3, "mean t = {mean_t}");
        assert_eq!(null.t_histogram.total(), 300);
        assert_eq!(null.p_histogram.total(), 300);
        // The observed sample against itself is as typical as it gets.
        assert!(null.empirical_p_value(0.0) > 0.3);
    }

    #[test]
    fn test_serial_matches_default_path() {
        let obs = observed();
        let cdf = cdf_of(&obs);
        let input = input(&obs, &cdf);
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 300);
        let default_path = run(&input, &progress, false).unwrap();
        let serial_path = run(&input, &progress, true).unwrap();
        assert_eq!(default_path, serial_path);
    }

    #[test]
    fn test_seed_changes_outcome() {
        let obs = observed();
        let cdf = cdf_of(&obs);
        let mut other = input(&obs, &cdf);
        other.seed = 7;
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 300);
        let a = simulate_null(&input(&obs, &cdf), &progress).unwrap();
        let b = simulate_null(&other, &progress).unwrap();
        assert_ne!(a.t_statistics, b.t_statistics);
    }

    #[test]
    fn test_constant_sales_give_degenerate_null() {
        let obs = vec![10.0; 30];
        let cdf = cdf_of(&obs);
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 300);
        let null = simulate_null(&input(&obs, &cdf), &progress).unwrap();
        assert!(null.t_statistics.iter().all(|&t| t == 0.0));
        assert_eq!(null.empirical_p_value(0.0), 1.0);
    }

    #[test]
    fn test_mismatched_price_aborts() {
        // $15 a day with a $10 price resamples to $10 a day: infinite t.
        let obs = vec![15.0; 30];
        let cdf = cdf_of(&obs);
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 300);
        let err = simulate_null(&input(&obs, &cdf), &progress).unwrap_err();
        assert!(matches!(err, EvalError::Simulation { stage: Stage::Hypothesis, .. }));
    }

    #[test]
    fn test_rejects_zero_trials() {
        let obs = observed();
        let cdf = cdf_of(&obs);
        let mut bad = input(&obs, &cdf);
        bad.number_sims = 0;
        let progress = ThrottledProgress::new(None, ProgressStage::NullDistribution, 0);
        assert!(simulate_null(&bad, &progress).is_err());
    }
}

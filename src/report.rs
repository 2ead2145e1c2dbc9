//! Report assembly.
//!
//! Packages the per-period summaries, the hypothesis test and the
//! projection into an [`EvaluationReport`]. Diagnostic fits that fail
//! degrade to `None` plus a warning instead of aborting the run.

use chrono::Utc;

use crate::analysis::{
    fit_gaussian, fit_poisson, FitError, GaussianFit, NullDistribution, WelchTest,
};
use crate::config::EvaluationConfig;
use crate::error::EvalError;
use crate::result::{EvaluationReport, Metadata, PeriodSummary, ProjectionResult, SalesStatistics};
use crate::series::{moving_average, DailySalesSeries};
use crate::statistics::{mean, normality_test, standard_error, EmpiricalDistribution};
use crate::types::Period;

/// Collects warnings while the pieces of a report are built.
#[derive(Debug, Default)]
pub(crate) struct ReportAssembler {
    warnings: Vec<String>,
}

/// Hypothesis-test outputs handed to [`ReportAssembler::statistics`].
pub(crate) struct HypothesisOutcome {
    pub welch: WelchTest,
    pub null_distribution: NullDistribution,
    pub gaussian_fit: Option<GaussianFit>,
}

impl ReportAssembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a degraded diagnostic.
    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Record a failed diagnostic fit as a warning.
    fn degrade(&mut self, what: String, err: FitError) {
        self.warn(format!("{what} unavailable: {}", EvalError::from(err)));
    }

    /// Warnings recorded so far.
    pub(crate) fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Summarize one observed period.
    pub(crate) fn period(
        &mut self,
        period: Period,
        amounts: &[f64],
        distribution: EmpiricalDistribution,
        moving_average_days: usize,
    ) -> PeriodSummary {
        let poisson_fit = match fit_poisson(&distribution) {
            Ok(fit) => Some(fit),
            Err(err) => {
                self.degrade(format!("{period:?} Poisson fit"), err);
                None
            }
        };

        PeriodSummary {
            days: amounts.len(),
            mean_daily_sales: mean(amounts),
            std_error_daily_sales: standard_error(amounts),
            mean_units_per_day: distribution.mean_units(),
            normality: normality_test(amounts),
            moving_average_normality: normality_test(&moving_average(amounts, moving_average_days)),
            poisson_fit,
            distribution,
        }
    }

    /// Fit a Gaussian to the null histogram, degrading to `None` on failure.
    pub(crate) fn gaussian(&mut self, null: &NullDistribution) -> Option<GaussianFit> {
        match fit_gaussian(&null.t_histogram) {
            Ok(fit) => Some(fit),
            Err(err) => {
                self.degrade("Gaussian fit of the null distribution".to_string(), err);
                None
            }
        }
    }

    /// Combine the period summaries and hypothesis test into the decision record.
    pub(crate) fn statistics(
        &self,
        no_adv: PeriodSummary,
        adv: PeriodSummary,
        hypothesis: HypothesisOutcome,
        alpha: f64,
        projection: &ProjectionResult,
    ) -> SalesStatistics {
        let HypothesisOutcome {
            welch,
            null_distribution,
            gaussian_fit,
        } = hypothesis;

        let empirical_p_value = null_distribution.empirical_p_value(welch.t_statistic);

        SalesStatistics {
            no_adv,
            adv,
            reject_null: empirical_p_value < alpha,
            reject_null_classical: welch.p_value < alpha,
            empirical_p_value,
            welch,
            null_distribution,
            coefficient_of_determination: gaussian_fit.as_ref().map(|fit| fit.r_squared),
            gaussian_fit,
            alpha,
            expected_profit_increase: projection.profit_increase.mean,
        }
    }

    /// Finish the report.
    pub(crate) fn finish(
        self,
        statistics: SalesStatistics,
        projection: ProjectionResult,
        metadata: Metadata,
    ) -> EvaluationReport {
        EvaluationReport {
            statistics,
            projection,
            metadata,
            warnings: self.warnings,
        }
    }
}

/// Run parameters and provenance for a finished evaluation.
pub(crate) fn metadata(
    config: &EvaluationConfig,
    series: &DailySalesSeries,
    unit_price: f64,
    unit_price_inferred: bool,
    runtime_secs: f64,
) -> Metadata {
    Metadata {
        input_identity: config.input_identity.clone(),
        first_day: series.first_day(),
        last_day: series.last_day(),
        start_date: config.start_date,
        unit_price,
        unit_price_inferred,
        unit_cost: config.unit_cost,
        annual_adv_expense: config.annual_adv_expense,
        number_sims: config.number_sims,
        seed: config.seed,
        bins: config.bins,
        generated_at: Utc::now(),
        runtime_secs,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::statistics::Histogram;

    fn null_from(t_statistics: Vec<f64>) -> NullDistribution {
        let p_values = vec![0.5; t_statistics.len()];
        NullDistribution {
            t_histogram: Histogram::new(&t_statistics, 10, Stage::Hypothesis).unwrap(),
            p_histogram: Histogram::with_range(&p_values, 10, 0.0, 1.0, Stage::Hypothesis).unwrap(),
            t_statistics,
            p_values,
        }
    }

    #[test]
    fn test_idle_period_degrades_poisson_fit() {
        let mut assembler = ReportAssembler::new();
        let dist = EmpiricalDistribution::estimate(&[0; 30]).unwrap();
        let summary = assembler.period(Period::NoAdvertising, &[0.0; 30], dist, 30);

        assert_eq!(summary.days, 30);
        assert_eq!(summary.mean_daily_sales, 0.0);
        assert_eq!(summary.std_error_daily_sales, 0.0);
        assert!(summary.normality.is_none());
        assert!(summary.poisson_fit.is_none());
        assert_eq!(assembler.warnings().len(), 1);
        assert!(assembler.warnings()[0].contains("Poisson"));
    }

    #[test]
    fn test_varied_period_has_diagnostics() {
        let mut assembler = ReportAssembler::new();
        let units: Vec<u32> = (0..64).map(|i| [0, 1, 1, 2, 1, 3, 0, 2][i % 8]).collect();
        let amounts: Vec<f64> = units.iter().map(|&u| f64::from(u) * 5.0).collect();
        let dist = EmpiricalDistribution::estimate(&units).unwrap();
        let summary = assembler.period(Period::Advertising, &amounts, dist, 7);

        assert!(summary.normality.is_some());
        assert!(summary.moving_average_normality.is_some());
        assert!((summary.mean_units_per_day - 1.25).abs() < 1e-12);
        assert!(summary.poisson_fit.is_some(), "{:?}", assembler.warnings());
    }

    #[test]
    fn test_degenerate_null_degrades_gaussian_fit() {
        let mut assembler = ReportAssembler::new();
        let null = null_from(vec![0.0; 50]);
        assert!(assembler.gaussian(&null).is_none());
        let warning = &assembler.warnings()[0];
        assert!(warning.contains("Gaussian"), "{warning}");
        assert!(warning.contains("curve fit failed"), "{warning}");
    }

    #[test]
    fn test_bell_shaped_null_fits() {
        let mut assembler = ReportAssembler::new();
        // Deterministic bell-shaped sample: normal quantiles.
        let normal = statrs::distribution::Normal::new(0.0, 1.0).unwrap();
        let t: Vec<f64> = (1..500)
            .map(|i| {
                use statrs::distribution::ContinuousCDF;
                normal.inverse_cdf(i as f64 / 500.0)
            })
            .collect();
        let fit = assembler.gaussian(&null_from(t)).unwrap();
        assert!(fit.mean.abs() < 0.1);
        assert!(fit.r_squared > 0.9);
        assert!(assembler.warnings().is_empty());
    }
}

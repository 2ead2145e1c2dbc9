//! Configuration for an evaluation run.

use std::env;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ALPHA, DEFAULT_ANNUAL_ADV_EXPENSE, DEFAULT_BINS, DEFAULT_MOVING_AVERAGE_DAYS,
    DEFAULT_NUMBER_SIMS, DEFAULT_SEED,
};
use crate::error::{EvalError, EvalResult};
use crate::statistics::check_unit_price;

/// Parameters of one evaluation, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// First day of the advertising period.
    pub start_date: NaiveDate,

    /// Dollars per unit; inferred from the sales amounts when `None`.
    pub unit_price: Option<f64>,

    /// Marginal cost per unit sold (default: 0.0).
    pub unit_cost: f64,

    /// Fixed annual cost of advertising (default: 6,000 = 500/month).
    pub annual_adv_expense: f64,

    /// Trials for the resampling null and the projection (default: 1,000).
    pub number_sims: usize,

    /// Root random seed (default: 113).
    pub seed: u64,

    /// Histogram bin count (default: 20).
    pub bins: usize,

    /// Significance threshold (default: 0.05).
    pub alpha: f64,

    /// Moving-average window in days for the smoothed normality check
    /// (default: 30).
    pub moving_average_days: usize,

    /// Name of the input, carried into the report metadata.
    pub input_identity: Option<String>,
}

impl EvaluationConfig {
    /// Defaults for a campaign starting on `start_date`.
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            unit_price: None,
            unit_cost: 0.0,
            annual_adv_expense: DEFAULT_ANNUAL_ADV_EXPENSE,
            number_sims: DEFAULT_NUMBER_SIMS,
            seed: DEFAULT_SEED,
            bins: DEFAULT_BINS,
            alpha: DEFAULT_ALPHA,
            moving_average_days: DEFAULT_MOVING_AVERAGE_DAYS,
            input_identity: None,
        }
    }

    /// Check every numeric parameter.
    ///
    /// # Errors
    ///
    /// `Parameter` naming the first invalid field.
    pub fn validate(&self) -> EvalResult<()> {
        if let Some(price) = self.unit_price {
            check_unit_price(price)?;
        }
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
            return Err(EvalError::parameter(
                "number_sims",
                0.0,
                "must be greater than zero",
            ));
        }
        if self.bins == 0 {
            return Err(EvalError::parameter("bins", 0.0, "must be greater than zero"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(EvalError::parameter(
                "alpha",
                self.alpha,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.moving_average_days == 0 {
            return Err(EvalError::parameter(
                "moving_average_days",
                0.0,
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Apply overrides from `ADRATER_*` environment variables.
    ///
    /// Recognized: `ADRATER_SIMS`, `ADRATER_SEED`, `ADRATER_BINS`,
    /// `ADRATER_ALPHA`, `ADRATER_UNIT_PRICE`, `ADRATER_UNIT_COST`,
    /// `ADRATER_AD_EXPENSE` and `ADRATER_START_DATE` (`YYYY-MM-DD`).
    /// Values that do not parse are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = parse_env("ADRATER_SIMS") {
            self.number_sims = n;
        }
        if let Some(seed) = parse_env("ADRATER_SEED") {
            self.seed = seed;
        }
        if let Some(bins) = parse_env("ADRATER_BINS") {
            self.bins = bins;
        }
        if let Some(alpha) = parse_env("ADRATER_ALPHA") {
            self.alpha = alpha;
        }
        if let Some(price) = parse_env("ADRATER_UNIT_PRICE") {
            self.unit_price = Some(price);
        }
        if let Some(cost) = parse_env("ADRATER_UNIT_COST") {
            self.unit_cost = cost;
        }
        if let Some(expense) = parse_env("ADRATER_AD_EXPENSE") {
            self.annual_adv_expense = expense;
        }
        if let Some(date) = parse_env("ADRATER_START_DATE") {
            self.start_date = date;
        }
        self
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 3, 31).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::new(start());
        assert_eq!(config.number_sims, 1000);
        assert_eq!(config.seed, 113);
        assert_eq!(config.bins, 20);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.annual_adv_expense, 6000.0);
        assert!(config.unit_price.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_names_field() {
        let mut config = EvaluationConfig::new(start());
        config.unit_cost = -1.0;
        assert!(matches!(
            config.validate(),
            Err(EvalError::Parameter { name: "unit_cost", .. })
        ));

        let mut config = EvaluationConfig::new(start());
        config.unit_price = Some(0.01);
        assert!(matches!(
            config.validate(),
            Err(EvalError::Parameter { name: "unit_price", .. })
        ));

        let mut config = EvaluationConfig::new(start());
        config.number_sims = 0;
        assert!(config.validate().is_err());

        let mut config = EvaluationConfig::new(start());
        config.alpha = 1.0;
        assert!(config.validate().is_err());

        let mut config = EvaluationConfig::new(start());
        config.alpha = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_and_ignores_garbage() {
        // Keys are unique to this test; nothing else reads them concurrently.
        env::set_var("ADRATER_SIMS", "250");
        env::set_var("ADRATER_START_DATE", "2019-01-15");
        env::set_var("ADRATER_UNIT_COST", "not a number");
        let config = EvaluationConfig::new(start()).with_env_overrides();
        env::remove_var("ADRATER_SIMS");
        env::remove_var("ADRATER_START_DATE");
        env::remove_var("ADRATER_UNIT_COST");

        assert_eq!(config.number_sims, 250);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2019, 1, 15).unwrap());
        assert_eq!(config.unit_cost, 0.0);
    }
}

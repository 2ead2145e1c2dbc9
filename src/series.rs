//! Daily sales series and the before/after campaign split.
//!
//! A [`DailySalesSeries`] holds one total per calendar day with no gaps.
//! It is built once per evaluation, either from an already clean series
//! ([`DailySalesSeries::new`]) or from raw ledger rows
//! ([`DailySalesSeries::from_transactions`]), and never mutated afterwards.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult, Stage};
use crate::types::{DailySales, Period, Transaction};

/// Gap-free, strictly consecutive daily sales totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySalesSeries {
    days: Vec<DailySales>,
}

impl DailySalesSeries {
    /// Validate an already aggregated series.
    ///
    /// # Errors
    ///
    /// `InputData` if the series is empty, a day does not follow its
    /// predecessor by exactly one calendar day, or an amount is negative
    /// or non-finite.
    pub fn new(days: Vec<DailySales>) -> EvalResult<Self> {
        if days.is_empty() {
            return Err(EvalError::input(Stage::Series, "series contains no days"));
        }

        for (index, entry) in days.iter().enumerate() {
            if !entry.amount.is_finite() || entry.amount < 0.0 {
                return Err(EvalError::input(
                    Stage::Series,
                    format!(
                        "amount {} on {} must be finite and non-negative",
                        entry.amount, entry.day
                    ),
                ));
            }
            if index > 0 {
                let previous = days[index - 1].day;
                if previous.succ_opt() != Some(entry.day) {
                    return Err(EvalError::input(
                        Stage::Series,
                        format!(
                            "day {} does not immediately follow {} (position {})",
                            entry.day, previous, index
                        ),
                    ));
                }
            }
        }

        Ok(Self { days })
    }

    /// Build a series from consecutive amounts starting at `first_day`.
    pub fn from_amounts(first_day: NaiveDate, amounts: &[f64]) -> EvalResult<Self> {
        let mut days = Vec::with_capacity(amounts.len());
        let mut day = first_day;
        for (index, &amount) in amounts.iter().enumerate() {
            if index > 0 {
                day = day.succ_opt().ok_or_else(|| {
                    EvalError::input(Stage::Series, "calendar overflow while building series")
                })?;
            }
            days.push(DailySales { day, amount });
        }
        Self::new(days)
    }

    /// Aggregate raw ledger rows into daily totals.
    ///
    /// Rows are grouped by date regardless of input order. When
    /// `sales_kind` is given, rows whose `kind` differs are skipped (rows
    /// without a kind are kept). Days between the first and last kept row
    /// that have no sales are filled with 0.0.
    ///
    /// # Errors
    ///
    /// `InputData` if no rows survive the filter, an amount is not finite,
    /// or a day's total is negative (refunds exceeding sales).
    pub fn from_transactions(
        transactions: &[Transaction],
        sales_kind: Option<&str>,
    ) -> EvalResult<Self> {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();

        for row in transactions {
            if let (Some(wanted), Some(kind)) = (sales_kind, row.kind.as_deref()) {
                if kind != wanted {
                    continue;
                }
            }
            if !row.amount.is_finite() {
                return Err(EvalError::input(
                    Stage::Series,
                    format!("non-finite amount on {}", row.date),
                ));
            }
            *totals.entry(row.date).or_insert(0.0) += row.amount;
        }

        let (first, last) = match (totals.keys().next(), totals.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(EvalError::input(
                    Stage::Series,
                    match sales_kind {
                        Some(kind) => format!("no ledger rows of type '{kind}'"),
                        None => "ledger is empty".to_string(),
                    },
                ))
            }
        };

        let mut days = Vec::with_capacity((last - first).num_days() as usize + 1);
        let mut day = first;
        loop {
            let amount = totals.get(&day).copied().unwrap_or(0.0);
            days.push(DailySales { day, amount });
            if day == last {
                break;
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        tracing::debug!(
            rows = transactions.len(),
            days = days.len(),
            "aggregated ledger into daily totals"
        );

        Self::new(days)
    }

    /// Number of days in the series.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The daily entries in calendar order.
    pub fn days(&self) -> &[DailySales] {
        &self.days
    }

    /// First calendar day.
    pub fn first_day(&self) -> NaiveDate {
        self.days[0].day
    }

    /// Last calendar day.
    pub fn last_day(&self) -> NaiveDate {
        self.days[self.days.len() - 1].day
    }

    /// All daily amounts in calendar order.
    pub fn amounts(&self) -> Vec<f64> {
        self.days.iter().map(|d| d.amount).collect()
    }
}

/// Partition of a series into the no-advertising and advertising periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMask {
    periods: Vec<Period>,
}

impl PeriodMask {
    /// Split `series` at `start_date` (days on or after it are advertising).
    ///
    /// # Errors
    ///
    /// `InputData` if either period would be empty.
    pub fn split(series: &DailySalesSeries, start_date: NaiveDate) -> EvalResult<Self> {
        let periods: Vec<Period> = series
            .days()
            .iter()
            .map(|d| Period::of(d.day, start_date))
            .collect();

        let mask = Self { periods };

        for period in [Period::NoAdvertising, Period::Advertising] {
            if mask.count(period) == 0 {
                return Err(EvalError::input(
                    Stage::Series,
                    format!(
                        "{:?} period is empty: start date {} vs series {}..={}",
                        period,
                        start_date,
                        series.first_day(),
                        series.last_day()
                    ),
                ));
            }
        }

        Ok(mask)
    }

    /// Number of days in `period`.
    pub fn count(&self, period: Period) -> usize {
        self.periods.iter().filter(|&&p| p == period).count()
    }

    /// Select the entries of `values` (parallel to the series) in `period`.
    pub fn select(&self, values: &[f64], period: Period) -> Vec<f64> {
        values
            .iter()
            .zip(&self.periods)
            .filter(|(_, &p)| p == period)
            .map(|(&v, _)| v)
            .collect()
    }

    /// Daily amounts of `series` in `period`.
    pub fn amounts(&self, series: &DailySalesSeries, period: Period) -> Vec<f64> {
        self.select(&series.amounts(), period)
    }
}

/// Centred moving average with output length equal to input length.
///
/// Equivalent to convolving with a box of `window` taps of weight
/// `1/window` in "same" mode: positions near the ends see zero padding.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || window == 0 {
        return Vec::new();
    }

    // Full convolution has n + window - 1 points; "same" keeps the centred n.
    let offset = (window - 1) / 2;
    let weight = 1.0 / window as f64;

    (0..n)
        .map(|i| {
            let full_index = i + offset;
            let lo = full_index.saturating_sub(window - 1);
            let hi = full_index.min(n - 1);
            values[lo..=hi].iter().sum::<f64>() * weight
        })
        .collect()
}

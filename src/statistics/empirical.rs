//! Empirical distribution of units sold per day.
//!
//! The distribution models "units sold on a day", so days without sales
//! count toward the denominator. Each bin also carries a Poisson-style
//! standard error `sqrt(count) / N` that later drives the perturbation of
//! the distribution in the projection simulation.

use serde::{Deserialize, Serialize};

use crate::constants::STD_ERROR_FLOOR;
use crate::error::{EvalError, EvalResult, Stage};

/// Probability mass over `0..=max_units` with per-bin standard errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpiricalDistribution {
    pmf: Vec<f64>,
    std_error: Vec<f64>,
    counts: Vec<u32>,
    n_days: usize,
}

impl EmpiricalDistribution {
    /// Estimate the distribution from per-day unit counts.
    ///
    /// # Errors
    ///
    /// `InputData` if `unit_counts` is empty.
    pub fn estimate(unit_counts: &[u32]) -> EvalResult<Self> {
        let max_units = unit_counts.iter().copied().max().ok_or_else(|| {
            EvalError::input(Stage::Distribution, "cannot estimate a distribution from zero days")
        })?;

        let mut counts = vec![0u32; max_units as usize + 1];
        for &units in unit_counts {
            counts[units as usize] += 1;
        }

        let n_days = unit_counts.len();
        let n = n_days as f64;
        let pmf = counts.iter().map(|&c| c as f64 / n).collect();
        let std_error = counts.iter().map(|&c| (c as f64).sqrt() / n).collect();

        Ok(Self {
            pmf,
            std_error,
            counts,
            n_days,
        })
    }

    /// Probability of selling `i` units on a day, for `i` in `0..len()`.
    pub fn pmf(&self) -> &[f64] {
        &self.pmf
    }

    /// Poisson standard error of each bin.
    pub fn std_error(&self) -> &[f64] {
        &self.std_error
    }

    /// Raw day counts per bin.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Number of days the distribution was estimated from.
    pub fn n_days(&self) -> usize {
        self.n_days
    }

    /// Number of bins (`max observed units + 1`).
    pub fn len(&self) -> usize {
        self.pmf.len()
    }

    /// Never true for an estimated distribution.
    pub fn is_empty(&self) -> bool {
        self.pmf.is_empty()
    }

    /// Mean units sold per day.
    pub fn mean_units(&self) -> f64 {
        self.pmf
            .iter()
            .enumerate()
            .map(|(units, p)| units as f64 * p)
            .sum()
    }

    /// Standard errors with zero bins raised to the floor, for use as
    /// least-squares weights.
    pub fn fit_weights(&self) -> Vec<f64> {
        self.std_error
            .iter()
            .map(|&e| if e == 0.0 { STD_ERROR_FLOOR } else { e })
            .collect()
    }

    /// Running sum of the probability masses.
    pub fn cumulative(&self) -> CumulativeDistribution {
        CumulativeDistribution::from_pmf(&self.pmf)
    }
}

/// Cumulative distribution used for inverse-CDF sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDistribution {
    cdf: Vec<f64>,
}

impl CumulativeDistribution {
    /// Accumulate a probability mass function.
    ///
    /// The last entry is pinned to exactly 1.0 when `pmf` sums to one
    /// within rounding, so every uniform draw in `[0, 1)` finds a bin.
    pub fn from_pmf(pmf: &[f64]) -> Self {
        let mut running = 0.0;
        let mut cdf: Vec<f64> = pmf
            .iter()
            .map(|p| {
                running += p;
                running
            })
            .collect();

        if let Some(last) = cdf.last_mut() {
            if (*last - 1.0).abs() < 1e-9 {
                *last = 1.0;
            }
        }

        Self { cdf }
    }

    /// Cumulative probabilities, one per bin.
    pub fn values(&self) -> &[f64] {
        &self.cdf
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.cdf.len()
    }

    /// True when there are no bins.
    pub fn is_empty(&self) -> bool {
        self.cdf.is_empty()
    }

    /// Recover the probability masses by first differences.
    pub fn pmf(&self) -> Vec<f64> {
        let mut previous = 0.0;
        self.cdf
            .iter()
            .map(|&c| {
                let p = c - previous;
                previous = c;
                p
            })
            .collect()
    }
}

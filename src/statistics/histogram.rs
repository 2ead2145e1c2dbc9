//! Fixed-width histograms and the summaries read off them.
//!
//! Binning matches the conventional scientific-computing definition: `bins`
//! equal-width bins spanning `[min, max]`, every bin half-open except the
//! last, which also includes its right edge. A degenerate range (all values
//! equal) is widened to `[v - 0.5, v + 0.5]`.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult, Stage};

/// Bin counts with `bins + 1` monotonically increasing edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Number of values in each bin.
    pub counts: Vec<u64>,
    /// Bin edges; bin `i` spans `edges[i]..edges[i + 1]`.
    pub edges: Vec<f64>,
}

impl Histogram {
    /// Histogram `values` over their own range.
    ///
    /// # Errors
    ///
    /// `InputData` if `values` is empty, `bins` is zero, or any value is
    /// not finite.
    pub fn new(values: &[f64], bins: usize, stage: Stage) -> EvalResult<Self> {
        if values.is_empty() {
            return Err(EvalError::input(stage, "cannot histogram an empty sample"));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(EvalError::input(
                stage,
                format!("cannot histogram non-finite value {bad}"),
            ));
        }

        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Self::with_range(values, bins, lo, hi, stage)
    }

    /// Histogram `values` over the fixed range `[lo, hi]`.
    ///
    /// Values outside the range are not counted.
    pub fn with_range(
        values: &[f64],
        bins: usize,
        lo: f64,
        hi: f64,
        stage: Stage,
    ) -> EvalResult<Self> {
        if bins == 0 {
            return Err(EvalError::input(stage, "histogram needs at least one bin"));
        }
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(EvalError::input(
                stage,
                format!("invalid histogram range [{lo}, {hi}]"),
            ));
        }

        let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins)
            .map(|i| if i == bins { hi } else { lo + width * i as f64 })
            .collect();

        let mut counts = vec![0u64; bins];
        for &value in values {
            if let Some(bin) = bin_index(&edges, value) {
                counts[bin] += 1;
            }
        }

        tracing::trace!(bins, lo, hi, n = values.len(), "histogram");

        Ok(Self { counts, edges })
    }

    /// Number of bins.
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of counted values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Bin centres.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Counts as floating point weights.
    pub fn weights(&self) -> Vec<f64> {
        self.counts.iter().map(|&c| c as f64).collect()
    }

    /// Probability density per bin (integrates to one over the range).
    pub fn density(&self) -> Vec<f64> {
        let total = self.total() as f64;
        if total == 0.0 {
            return vec![0.0; self.bins()];
        }
        self.counts
            .iter()
            .zip(self.edges.windows(2))
            .map(|(&c, w)| c as f64 / (total * (w[1] - w[0])))
            .collect()
    }

    /// Probability mass per bin (sums to one).
    pub fn mass(&self) -> Vec<f64> {
        let total = self.total() as f64;
        if total == 0.0 {
            return vec![0.0; self.bins()];
        }
        self.counts.iter().map(|&c| c as f64 / total).collect()
    }

    /// Fraction of mass below `threshold`, see [`compute_loss_fraction`].
    pub fn loss_fraction(&self, threshold: f64) -> f64 {
        compute_loss_fraction(&self.weights(), &self.edges, threshold)
    }

    /// Two-sided empirical p-value of `observed` against this histogram.
    ///
    /// The bin holding `observed` is counted on both sides, so the result
    /// is `min(mass at or below that bin, mass at or above it)`. Counting
    /// it on the low side only would give p = 0 whenever the observation
    /// falls in the lowest occupied bin, including the all-zero null of two
    /// identical periods. An observation outside the histogram range has
    /// p-value 0.
    pub fn empirical_p_value(&self, observed: f64) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 1.0;
        }
        let Some(bin) = bin_index(&self.edges, observed) else {
            return 0.0;
        };

        let below: u64 = self.counts[..=bin].iter().sum();
        let above: u64 = self.counts[bin..].iter().sum();
        below.min(above) as f64 / total
    }
}

/// Index of the bin containing `value`, `None` outside `[edges[0], edges[n]]`.
fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    let bins = edges.len().checked_sub(1)?;
    let (lo, hi) = (edges[0], edges[bins]);
    if bins == 0 || value.is_nan() || value < lo || value > hi {
        return None;
    }

    let mut index = (((value - lo) / (hi - lo)) * bins as f64) as usize;
    index = index.min(bins - 1);
    // Correct the arithmetic estimate against the stored edges.
    while index > 0 && value < edges[index] {
        index -= 1;
    }
    while index + 1 < bins && value >= edges[index + 1] {
        index += 1;
    }
    Some(index)
}

/// Fraction of histogram mass strictly below `threshold`.
///
/// Bins entirely below the threshold count fully; the bin straddling it
/// contributes linearly in proportion to the part of its width below the
/// threshold. The result is normalized by the total mass, so it lies in
/// `[0, 1]`. Empty histograms give 0.
pub fn compute_loss_fraction(bins: &[f64], edges: &[f64], threshold: f64) -> f64 {
    let total: f64 = bins.iter().sum();
    if total <= 0.0 || edges.len() != bins.len() + 1 {
        return 0.0;
    }

    let mut below = 0.0;
    for (weight, edge) in bins.iter().zip(edges.windows(2)) {
        let (lo, hi) = (edge[0], edge[1]);
        if hi <= threshold {
            below += weight;
        } else if lo < threshold {
            below += weight * (threshold - lo) / (hi - lo);
        }
    }
    below / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(values: &[f64], bins: usize) -> Histogram {
        Histogram::new(values, bins, Stage::Projection).unwrap()
    }

    #[test]
    fn test_last_bin_is_closed() {
        let h = hist(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn test_degenerate_range_widened() {
        let h = hist(&[-6000.0; 10], 20);
        assert_eq!(h.edges[0], -6000.5);
        assert_eq!(h.edges[20], -5999.5);
        assert_eq!(h.total(), 10);
        assert_eq!(h.counts.iter().filter(|&&c| c > 0).count(), 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Histogram::new(&[], 5, Stage::Projection).is_err());
        assert!(Histogram::new(&[1.0, f64::NAN], 5, Stage::Projection).is_err());
        assert!(Histogram::new(&[1.0], 0, Stage::Projection).is_err());
    }

    #[test]
    fn test_with_range_ignores_outliers() {
        let h = Histogram::with_range(&[-1.0, 0.5, 1.5, 9.0], 2, 0.0, 2.0, Stage::Projection)
            .unwrap();
        assert_eq!(h.counts, vec![1, 1]);
    }

    #[test]
    fn test_density_integrates_to_one() {
        let values: Vec<f64> = (0..100).map(|i| (i as f64).sqrt()).collect();
        let h = hist(&values, 7);
        let integral: f64 = h
            .density()
            .iter()
            .zip(h.edges.windows(2))
            .map(|(d, w)| d * (w[1] - w[0]))
            .sum();
        assert!((integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_loss_fraction_symmetric_is_half() {
        let bins = [1.0, 3.0, 5.0, 5.0, 3.0, 1.0];
        let edges = [-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];
        assert!((compute_loss_fraction(&bins, &edges, 0.0) - 0.5).abs() < 1e-12);

        // Odd bin count: threshold splits the middle bin.
        let bins = [2.0, 6.0, 2.0];
        let edges = [-1.5, -0.5, 0.5, 1.5];
        assert!((compute_loss_fraction(&bins, &edges, 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_loss_fraction_interpolates_nonzero_threshold() {
        let bins = [10.0, 10.0];
        let edges = [100.0, 200.0, 300.0];
        assert!((compute_loss_fraction(&bins, &edges, 150.0) - 0.25).abs() < 1e-12);
        assert_eq!(compute_loss_fraction(&bins, &edges, 50.0), 0.0);
        assert_eq!(compute_loss_fraction(&bins, &edges, 400.0), 1.0);
    }

    #[test]
    fn test_empirical_p_value_degenerate_null() {
        let h = hist(&[0.0; 50], 20);
        assert_eq!(h.empirical_p_value(0.0), 1.0);
        assert_eq!(h.empirical_p_value(-8.0), 0.0);
        assert_eq!(h.empirical_p_value(f64::NEG_INFINITY), 0.0);
        assert_eq!(h.empirical_p_value(f64::NAN), 0.0);
    }

    #[test]
    fn test_empirical_p_value_tails() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let h = hist(&values, 10);
        // 9.5 sits in the first bin: 10 values at or below it.
        assert!((h.empirical_p_value(9.5) - 0.1).abs() < 1e-12);
        assert!((h.empirical_p_value(49.5) - 0.5).abs() < 1e-12);
        assert!((h.empirical_p_value(99.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_observed_bin_counts_on_both_sides() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let h = hist(&values, 10);
        // Bin 4 holds 40..50: 50 values at or below it, 60 at or above it.
        assert!((h.empirical_p_value(45.0) - 0.5).abs() < 1e-12);
        // The lowest bin still has its own mass on the low side.
        assert!((h.empirical_p_value(0.0) - 0.1).abs() < 1e-12);
    }
}

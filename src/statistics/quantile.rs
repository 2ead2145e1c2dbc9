//! Quantiles of simulated outcome distributions.
//!
//! All quantiles use the R-7 definition (linear interpolation between
//! order statistics), the default of most statistics packages.

use crate::constants::PROFIT_PERCENTILES;

/// Quantile of already sorted data.
///
/// The caller must ensure `sorted` is in ascending order.
pub fn compute_quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }

    let n = sorted.len();
    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        Some(sorted[n - 1])
    } else if h_frac == 0.0 {
        Some(sorted[h_floor])
    } else {
        Some(sorted[h_floor] + h_frac * (sorted[h_floor + 1] - sorted[h_floor]))
    }
}

/// Percentiles of `data` at each probability in `probs`.
///
/// Sorts a copy once, then reads every quantile off the sorted data.
/// Returns an empty vector for empty input.
pub fn compute_percentiles(data: &[f64], probs: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }

    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    probs
        .iter()
        .filter_map(|&p| compute_quantile_sorted(&sorted, p))
        .collect()
}

/// The standard profit summary percentiles (10, 25, 50, 75, 90).
pub fn profit_percentiles(data: &[f64]) -> Vec<f64> {
    compute_percentiles(data, &PROFIT_PERCENTILES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_median_and_extremes() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(compute_quantile_sorted(&sorted, 0.5), Some(3.0));
        assert_eq!(compute_quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(compute_quantile_sorted(&sorted, 1.0), Some(5.0));
    }

    #[test]
    fn test_interpolates_between_order_statistics() {
        // h = 3 * 0.25 = 0.75 -> 0 + 0.75 * (10 - 0)
        let pct = compute_percentiles(&[10.0, 0.0, 20.0, 30.0], &[0.25]);
        assert!((pct[0] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_profit_percentiles_monotone() {
        let data: Vec<f64> = (0..101).map(|x| -5000.0 + 100.0 * x as f64).rev().collect();
        let pct = profit_percentiles(&data);
        assert_eq!(pct.len(), 5);
        assert!((pct[2] - 0.0).abs() < 1e-9);
        assert!(pct.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(compute_quantile_sorted(&[], 0.5).is_none());
        assert!(compute_quantile_sorted(&[1.0], 1.5).is_none());
        assert!(compute_percentiles(&[], &[0.5]).is_empty());
    }
}

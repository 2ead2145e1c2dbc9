//! Distribution perturbation and inverse-CDF sampling.
//!
//! Two independent sources of uncertainty are modelled here. [`perturb`]
//! jitters the estimated distribution itself by its per-bin standard
//! error (parameter uncertainty), and [`sample_into`] draws unit counts
//! from a fixed distribution (sampling uncertainty).

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{EvalError, EvalResult, Stage};
use crate::statistics::CumulativeDistribution;

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter. Every simulation trial seeds its own
/// generator with `counter_rng_seed(stage_seed, trial)`, so the output does
/// not depend on the order in which trials run.
///
/// # Arguments
///
/// * `base_seed` - Base random seed
/// * `counter` - Trial or stage counter (0, 1, 2, ...)
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Perturb a cumulative distribution by its per-bin standard error.
///
/// The pmf is recovered by first differences, each bin receives independent
/// Gaussian noise `N(0, std_error[i])`, negative masses are clamped to zero,
/// and the result is renormalized and re-accumulated. A fresh object is
/// returned; `cdf` is not modified.
///
/// If the noise wipes out all mass (possible for tiny samples), the
/// unperturbed distribution is returned unchanged.
///
/// # Errors
///
/// `Simulation` if `std_error` does not have one entry per bin.
pub fn perturb<R: Rng + ?Sized>(
    cdf: &CumulativeDistribution,
    std_error: &[f64],
    rng: &mut R,
) -> EvalResult<CumulativeDistribution> {
    if std_error.len() != cdf.len() {
        return Err(EvalError::simulation(
            Stage::Distribution,
            format!(
                "std_error has {} bins but the distribution has {}",
                std_error.len(),
                cdf.len()
            ),
        ));
    }

    let mut pmf = cdf.pmf();
    for (p, &sigma) in pmf.iter_mut().zip(std_error) {
        let noise: f64 = rng.sample(StandardNormal);
        *p = (*p + sigma * noise).max(0.0);
    }

    let total: f64 = pmf.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        tracing::debug!(total, "perturbation removed all mass; keeping estimate");
        return Ok(cdf.clone());
    }

    for p in &mut pmf {
        *p /= total;
    }
    Ok(CumulativeDistribution::from_pmf(&pmf))
}

/// Index of the first bin whose cumulative probability strictly exceeds `u`.
///
/// A draw that lands exactly on a boundary goes to the higher bin. Values
/// beyond the last cumulative entry (possible only through rounding) map to
/// the last bin.
#[inline]
pub fn inverse_cdf(cdf: &[f64], u: f64) -> usize {
    let index = cdf.partition_point(|&c| c <= u);
    index.min(cdf.len().saturating_sub(1))
}

/// Fill `out` with unit counts drawn from `cdf`.
///
/// Writes into a preallocated buffer so the simulation hot loops avoid
/// allocating per trial.
pub fn sample_into<R: Rng + ?Sized>(cdf: &CumulativeDistribution, out: &mut [u32], rng: &mut R) {
    let values = cdf.values();
    for slot in out.iter_mut() {
        let u: f64 = rng.random();
        *slot = inverse_cdf(values, u) as u32;
    }
}

/// Draw `n` unit counts from `cdf`.
pub fn sample<R: Rng + ?Sized>(cdf: &CumulativeDistribution, n: usize, rng: &mut R) -> Vec<u32> {
    let mut out = vec![0u32; n];
    sample_into(cdf, &mut out, rng);
    out
}

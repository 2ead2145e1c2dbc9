//! Analysis pipeline for advertising effectiveness.
//!
//! 1. **Welch's test** ([`welch`]): classical unequal-variance comparison of the two periods
//! 2. **Resampling null** ([`null_distribution`]): empirical distribution of the t statistic when nothing changed
//! 3. **Curve fits** ([`curve_fit`]): Gaussian fit to the null, Poisson fits to the periods
//! 4. **Projection** ([`projection`]): annual sales and profit simulation with a control arm

mod curve_fit;
mod null_distribution;
mod projection;
mod welch;

pub use curve_fit::{fit_gaussian, fit_poisson, FitError, GaussianFit, PoissonFit};
pub use null_distribution::{simulate_null, NullDistribution, NullInput};
pub use projection::{simulate, ProjectionInput};
pub use welch::{welch_from_summaries, welch_t_test, SampleSummary, WelchTest};

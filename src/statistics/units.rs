//! Unit price inference and dollar-to-unit conversion.
//!
//! Sales ledgers often record amounts without the price that produced them.
//! When every sale is an integer multiple of a single price, that price is
//! the greatest common divisor of the observed amounts (in cents).

use crate::constants::CENT;
use crate::error::{EvalError, EvalResult, Stage};

/// Relative slack added before flooring so that exact multiples survive
/// floating-point division (e.g. `0.3 / 0.1 = 2.9999999999999996`).
const UNIT_ROUNDING_SLACK: f64 = 1e-9;

/// Infer the unit price from observed daily or transaction amounts.
///
/// Takes all strictly positive amounts, converts them to whole cents,
/// reduces them by greatest common divisor and converts back to dollars.
///
/// # Errors
///
/// - `InputData` if no amount is positive (nothing to infer from) or an
///   amount is not finite.
/// - `InputData` if the inferred price is exactly one cent, which almost
///   always means the ledger mixes several prices or products.
pub fn infer_unit_price(amounts: &[f64]) -> EvalResult<f64> {
    let cents = positive_cents(amounts)?;
    let divisor = cents.iter().fold(0, |acc, &c| gcd(acc, c));

    let price = divisor as f64 / 100.0;
    check_unit_price(price).map_err(|_| {
        EvalError::input(
            Stage::UnitConversion,
            format!(
                "inferred unit price is ${price:.2}; amounts are not multiples of a single price \
                 (price change, several products, or data entry errors); set the unit price explicitly"
            ),
        )
    })?;

    tracing::debug!(price, positive = cents.len(), "inferred unit price");
    Ok(price)
}

/// Check a user-supplied unit price against the observed amounts.
///
/// Every positive amount must be a whole multiple of the price, compared
/// in whole cents. Otherwise [`amounts_to_units`] would silently floor the
/// remainders away and the simulated sales would sit below the observed
/// ones.
///
/// # Errors
///
/// - `InputData` if no amount is positive or an amount is not finite.
/// - `InputData` if some amount is not a multiple of `unit_price`.
pub fn check_price_divides(amounts: &[f64], unit_price: f64) -> EvalResult<()> {
    let price_cents = (unit_price * 100.0).round() as u64;
    if price_cents == 0 {
        return Err(EvalError::input(
            Stage::UnitConversion,
            format!("unit price ${unit_price} is below one cent"),
        ));
    }

    let cents = positive_cents(amounts)?;
    if let Some(&bad) = cents.iter().find(|&&c| c % price_cents != 0) {
        return Err(EvalError::input(
            Stage::UnitConversion,
            format!(
                "amount ${:.2} is not a multiple of the unit price ${unit_price:.2}",
                bad as f64 / 100.0
            ),
        ));
    }
    Ok(())
}

/// Whole-cent values of the strictly positive amounts.
fn positive_cents(amounts: &[f64]) -> EvalResult<Vec<u64>> {
    let mut cents = Vec::new();
    for &amount in amounts {
        if !amount.is_finite() {
            return Err(EvalError::input(
                Stage::UnitConversion,
                format!("amount {amount} is not finite"),
            ));
        }
        if amount > 0.0 {
            cents.push((amount * 100.0).round() as u64);
        }
    }

    if cents.is_empty() {
        return Err(EvalError::input(
            Stage::UnitConversion,
            "no positive amounts; the series records no sales",
        ));
    }
    Ok(cents)
}

/// Validate a unit price, inferred or user-supplied.
///
/// # Errors
///
/// `Parameter` if the price is not finite, not positive, or equal to the
/// one-cent sentinel.
pub fn check_unit_price(price: f64) -> EvalResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(EvalError::parameter(
            "unit_price",
            price,
            "must be finite and greater than zero",
        ));
    }
    if (price - CENT).abs() < 1e-12 {
        return Err(EvalError::parameter(
            "unit_price",
            price,
            "one cent indicates amounts that are not multiples of a single price",
        ));
    }
    Ok(())
}

/// Convert dollar amounts to whole units sold: `floor(amount / unit_price)`.
///
/// `unit_price` must already have passed [`check_unit_price`].
pub fn amounts_to_units(amounts: &[f64], unit_price: f64) -> Vec<u32> {
    amounts
        .iter()
        .map(|&amount| {
            let ratio = amount / unit_price;
            (ratio + ratio.abs() * UNIT_ROUNDING_SLACK).floor().max(0.0) as u32
        })
        .collect()
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

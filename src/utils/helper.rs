use num_traits::Float;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

/// Returns the square root of a decimal
///
/// Decimal has no exact square root, so the value goes through `f64` and back.
/// Precision is limited to what `f64` carries.
///
/// # Arguments
///
/// * `value` - The radicand
///
/// # Returns
///
/// * `Option<Decimal>` - The square root, or `None` if `value` is negative or
///   does not survive the float round trip
#[inline]
pub fn decimal_sqrt(value: Decimal) -> Option<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let root = Float::sqrt(value.to_f64()?);
    Decimal::from_f64(root)
}

/// Returns the sample standard deviation for a Welford sum of squared
/// deviations `s` over `count` values, or zero below two values
///
/// # Arguments
///
/// * `s` - Sum of squared deviations from the mean
/// * `count` - Number of values contributing to `s`
///
/// # Returns
///
/// * `Decimal` - `sqrt(s / (count - 1))`
#[inline]
pub fn sample_stddev(s: Decimal, count: u64) -> Decimal {
    if count < 2 {
        return Decimal::ZERO;
    }
    let variance = s / Decimal::from(count - 1);
    decimal_sqrt(variance.max(Decimal::ZERO)).unwrap_or(Decimal::ZERO)
}

//! Dew point from air temperature and relative humidity (Magnus formula).

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const MAGNUS_A: f64 = 17.27;
const MAGNUS_B: f64 = 237.7;

/// Dew point in °C, rounded to one decimal place.
///
/// Returns `None` unless `0 < humidity ≤ 100`.
///
/// ```
/// use rust_decimal_macros::dec;
/// use inspection_core::calculations::dew_point::dew_point;
///
/// assert_eq!(dew_point(dec!(20), dec!(50)), Some(dec!(9.3)));
/// ```
pub fn dew_point(
    temperature: Decimal,
    humidity: Decimal,
) -> Option<Decimal> {
    if humidity <= Decimal::ZERO || humidity > Decimal::ONE_HUNDRED {
        return None;
    }

    let t = temperature.to_f64()?;
    let rh = humidity.to_f64()?;

    let gamma = (rh / 100.0).ln() + MAGNUS_A * t / (MAGNUS_B + t);
    let dew_point = MAGNUS_B * gamma / (MAGNUS_A - gamma);
    if !dew_point.is_finite() {
        return None;
    }

    Decimal::from_f64(dew_point)
        .map(|value| value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
}

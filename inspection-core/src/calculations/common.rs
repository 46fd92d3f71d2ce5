//! Rounding and formatting helpers shared by the cost calculators.

use rust_decimal::{Decimal, RoundingStrategy};

const MINUTES_PER_HOUR: u64 = 60;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero, which is how every
/// money amount in an estimate is rounded.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use inspection_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(1407.1446875)), dec!(1407.14));
/// assert_eq!(round_half_up(dec!(180.315)), dec!(180.32));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts whole minutes to hours without intermediate rounding.
///
/// ```
/// use rust_decimal_macros::dec;
/// use inspection_core::calculations::common::minutes_to_hours;
///
/// assert_eq!(minutes_to_hours(90), dec!(1.5));
/// ```
pub fn minutes_to_hours(minutes: u64) -> Decimal {
    Decimal::from(minutes) / Decimal::from(MINUTES_PER_HOUR)
}

/// Formats a money amount as dollars with thousands separators, e.g. `$1,216.99`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_half_up(value);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

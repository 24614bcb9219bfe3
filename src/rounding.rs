use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

pub const DISPLAY_DECIMALS: u32 = 2;

// Above 2^53 every f64 is an integer, so there is nothing left to round.
const INTEGRAL_ONLY: f64 = 9_007_199_254_740_992.0;

/// Rounds to two decimals with ties going away from zero.
///
/// The tie is decided on the shortest decimal string of the value, not on its
/// binary expansion, so `2.005` becomes `2.01` even though the nearest double
/// is slightly below `2.005`.
pub fn round2(value: f64) -> f64 {
    round_dp(value, DISPLAY_DECIMALS)
}

pub fn round_dp(value: f64, dp: u32) -> f64 {
    if !value.is_finite() || value.abs() >= INTEGRAL_ONLY {
        return value;
    }
    let half_unit = 0.5 * 10f64.powi(-(dp as i32));
    if value.abs() < half_unit {
        return 0.0_f64.copysign(value);
    }

    // `Display` for f64 prints the shortest digits that round-trip, without exponent.
    let Ok(decimal) = Decimal::from_str(&value.to_string()) else {
        return value;
    };
    let rounded = decimal.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    f64::from_str(&rounded.to_string()).unwrap_or(value)
}

/// Formats a number the way a table cell shows it: no trailing zeros,
/// no negative zero.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }
    value.to_string()
}

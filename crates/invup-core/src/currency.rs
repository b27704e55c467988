//! Currency formatting for Israeli New Shekel amounts in the Hebrew locale.
//!
//! Follows the CLDR he-IL currency pattern used by
//! `Intl.NumberFormat("he-IL", {style: "currency", currency: "ILS"})`: a
//! right-to-left mark, a left-to-right mark before the minus sign, comma
//! grouping, two fraction digits, then a non-breaking space and a
//! right-to-left mark ahead of the shekel sign.
//!
//! The browser build formats through the platform's `Intl` instead, so the
//! page always follows the locale data it ships with.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// The shekel sign.
pub const SHEKEL_SIGN: char = '₪';

/// Fraction digits shown for every amount.
pub const FRACTION_DIGITS: u32 = 2;

pub(crate) const RIGHT_TO_LEFT_MARK: char = '\u{200f}';
pub(crate) const LEFT_TO_RIGHT_MARK: char = '\u{200e}';
pub(crate) const NO_BREAK_SPACE: char = '\u{a0}';

/// Format an amount as a he-IL ILS currency string.
///
/// Rounds half away from zero. Negative amounts keep their sign even when
/// they round to zero.
pub fn format_currency(amount: Decimal) -> String {
    let negative = amount.is_sign_negative();
    let mut rounded = amount.abs().round_dp_with_strategy(
        FRACTION_DIGITS,
        RoundingStrategy::MidpointAwayFromZero,
    );
    rounded.rescale(FRACTION_DIGITS);

    let digits = rounded.to_string();
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    compose(negative, integer, fraction)
}

/// Format a floating point amount.
///
/// Total over finite input: the amount is read from its shortest decimal
/// representation, and magnitudes beyond [`Decimal`]'s range are printed
/// digit for digit. `NaN` and infinities are rendered as `NaN` and `∞`.
pub fn format_currency_f64(amount: f64) -> String {
    let negative = amount.is_sign_negative();
    if amount.is_nan() {
        return compose(false, "NaN", "");
    }
    if amount.is_infinite() {
        return compose(negative, "∞", "");
    }

    // `Display` for f64 never uses exponent notation.
    let shortest = amount.abs().to_string();
    match Decimal::from_str(&shortest) {
        Ok(value) => {
            let formatted = format_currency(value);
            if negative {
                with_sign(&formatted)
            } else {
                formatted
            }
        }
        // Too small for 28 decimal places.
        Err(_) if amount.abs() < 1.0 => compose(negative, "0", "00"),
        // Beyond 2^96 there is no fractional part left to round.
        Err(_) => {
            let integer = shortest.split('.').next().unwrap_or(&shortest);
            compose(negative, integer, "00")
        }
    }
}

fn with_sign(formatted: &str) -> String {
    let unsigned = formatted.trim_start_matches(RIGHT_TO_LEFT_MARK);
    format!("{RIGHT_TO_LEFT_MARK}{LEFT_TO_RIGHT_MARK}-{unsigned}")
}

fn compose(negative: bool, integer: &str, fraction: &str) -> String {
    let mut out = String::with_capacity(integer.len() + fraction.len() + 16);
    out.push(RIGHT_TO_LEFT_MARK);
    if negative {
        out.push(LEFT_TO_RIGHT_MARK);
        out.push('-');
    }
    if integer.bytes().all(|b| b.is_ascii_digit()) {
        out.push_str(&group_thousands(integer));
    } else {
        out.push_str(integer);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out.push(NO_BREAK_SPACE);
    out.push(RIGHT_TO_LEFT_MARK);
    out.push(SHEKEL_SIGN);
    out
}

fn group_thousands(integer: &str) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    // The visible figure, without direction marks or the currency suffix.
    fn figure(formatted: &str) -> String {
        formatted
            .trim_end_matches(SHEKEL_SIGN)
            .chars()
            .filter(|c| !matches!(*c, RIGHT_TO_LEFT_MARK | LEFT_TO_RIGHT_MARK | NO_BREAK_SPACE))
            .collect()
    }

    #[test]
    fn test_format_shape() {
        let formatted = format_currency(Decimal::new(12345, 1));

        assert!(formatted.starts_with(RIGHT_TO_LEFT_MARK));
        assert!(formatted.ends_with(SHEKEL_SIGN));
        assert!(formatted.contains(NO_BREAK_SPACE));
        assert_eq!(figure(&formatted), "1,234.50");
    }

    #[test]
    fn test_format_grouping() {
        assert_eq!(figure(&format_currency(Decimal::ZERO)), "0.00");
        assert_eq!(figure(&format_currency(Decimal::new(999, 0))), "999.00");
        assert_eq!(figure(&format_currency(Decimal::new(100000, 0))), "100,000.00");
        assert_eq!(figure(&format_currency(Decimal::new(123456789, 2))), "1,234,567.89");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(figure(&format_currency(Decimal::new(1005, 3))), "1.01");
        assert_eq!(figure(&format_currency(Decimal::new(-1005, 3))), "-1.01");
        assert_eq!(figure(&format_currency(Decimal::new(1004, 3))), "1.00");
    }

    #[test]
    fn test_format_negative_isolates_minus_sign() {
        let formatted = format_currency(Decimal::new(-5, 0));
        let expected_prefix: String = [RIGHT_TO_LEFT_MARK, LEFT_TO_RIGHT_MARK, '-'].iter().collect();

        assert!(formatted.starts_with(&expected_prefix));
        assert_eq!(figure(&formatted), "-5.00");
    }

    #[test]
    fn test_format_negative_rounding_to_zero_keeps_sign() {
        assert_eq!(figure(&format_currency(Decimal::new(-1, 3))), "-0.00");
        assert_eq!(figure(&format_currency_f64(-0.001)), "-0.00");
        assert_eq!(figure(&format_currency_f64(-0.0)), "-0.00");
        assert_eq!(figure(&format_currency_f64(0.0)), "0.00");
    }

    #[test]
    fn test_format_f64_uses_shortest_digits() {
        assert_eq!(figure(&format_currency_f64(1234.5)), "1,234.50");
        // 1.005 is stored as 1.00499..., but reads back as 1.005.
        assert_eq!(figure(&format_currency_f64(1.005)), "1.01");
        assert_eq!(figure(&format_currency_f64(-5.0)), "-5.00");
        assert_eq!(format_currency_f64(2189.95), format_currency(Decimal::new(218995, 2)));
    }

    #[test]
    fn test_format_f64_beyond_decimal_range() {
        assert_eq!(
            figure(&format_currency_f64(1e30)),
            "1,000,000,000,000,000,000,000,000,000,000.00"
        );
        assert_eq!(
            figure(&format_currency_f64(-1e30)),
            "-1,000,000,000,000,000,000,000,000,000,000.00"
        );
        assert!(figure(&format_currency_f64(f64::MAX)).ends_with(".00"));
        assert_eq!(figure(&format_currency_f64(1e-30)), "0.00");
    }

    #[test]
    fn test_format_f64_non_finite() {
        assert!(format_currency_f64(f64::NAN).contains("NaN"));
        assert_eq!(figure(&format_currency_f64(f64::INFINITY)), "∞");
        assert_eq!(figure(&format_currency_f64(f64::NEG_INFINITY)), "-∞");
    }
}

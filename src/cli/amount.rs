//! Human-readable amounts.
//!
//! The ledger counts in base units. On the command line amounts are written
//! as decimals, e.g. `1.5` with 18 decimals is `1_500_000_000_000_000_000`.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::CliError;

/// Largest scale a [`Decimal`] can carry
const MAX_DECIMAL_SCALE: u8 = 28;

/// Parse a decimal string into base units with `decimals` places
pub fn parse_amount(input: &str, decimals: u8) -> Result<u128, CliError> {
    let invalid = |reason: &str| CliError::InvalidArgument(format!("amount {}: {}", input, reason));

    let value = Decimal::from_str(input.trim()).map_err(|e| invalid(&e.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("must not be negative"));
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(invalid(&format!("more than {} decimal places", decimals)));
    }

    let mantissa = value.mantissa().unsigned_abs();
    10u128
        .checked_pow(u32::from(decimals) - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| invalid("too large"))
}

/// Render base units as a decimal string with `decimals` places, trailing zeros trimmed
pub fn format_amount(amount: u128, decimals: u8) -> String {
    if decimals <= MAX_DECIMAL_SCALE {
        if let Ok(mantissa) = i128::try_from(amount) {
            if let Ok(value) = Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals)) {
                return value.normalize().to_string();
            }
        }
    }

    // Beyond 96 bits of mantissa; split the digits by hand.
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    let (int, frac) = if digits.len() > decimals {
        let (int, frac) = digits.split_at(digits.len() - decimals);
        (int.to_string(), frac.to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int
    } else {
        format!("{}.{}", int, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_amount("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(parse_amount("0.000001", 6).unwrap(), 1);
        assert_eq!(parse_amount("2.50", 1).unwrap(), 25);
        assert_eq!(parse_amount("42", 0).unwrap(), 42);
        assert_eq!(parse_amount("0", 18).unwrap(), 0);
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert!(parse_amount("-1", 18).is_err());
        assert!(parse_amount("0.0000001", 6).is_err());
        assert!(parse_amount("abc", 6).is_err());
        assert!(parse_amount("1.5", 0).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_500_000, 6), "1.5");
        assert_eq!(format_amount(1, 18), "0.000000000000000001");
        assert_eq!(format_amount(1_000_000_000_000_000_000, 18), "1");
        assert_eq!(format_amount(0, 18), "0");
        assert_eq!(format_amount(123, 0), "123");
    }

    #[test]
    fn test_format_huge_amount() {
        assert_eq!(
            format_amount(u128::MAX, 18),
            "340282366920938463463.374607431768211455"
        );
        assert_eq!(format_amount(u128::MAX / 10 * 10, 30), "340282366.92093846346337460743176821145");
    }

    proptest! {
        #[test]
        fn prop_format_then_parse(amount in 0u128..u64::MAX as u128, decimals in 0u8..=18) {
            let text = format_amount(amount, decimals);
            prop_assert_eq!(parse_amount(&text, decimals).unwrap(), amount);
        }
    }
}

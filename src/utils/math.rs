//! Checked integer arithmetic.
//!
//! Balances and fee rates are `u128`. Every helper here fails with
//! [`Error::ArithmeticOverflow`] instead of wrapping or saturating, so a bad
//! input magnitude aborts the surrounding operation.
//!
//! Fee products are formed in 256 bits, so only the floored quotient has to
//! fit back into a `u128`.

use primitive_types::U256;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b)
        .ok_or_else(|| Error::overflow(format!("{} + {}", a, b)))
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b)
        .ok_or_else(|| Error::overflow(format!("{} - {}", a, b)))
}

/// Safe multiplication with overflow check
pub fn safe_mul(a: u128, b: u128) -> Result<u128> {
    a.checked_mul(b)
        .ok_or_else(|| Error::overflow(format!("{} * {}", a, b)))
}

/// Safe division with zero check
pub fn safe_div(a: u128, b: u128) -> Result<u128> {
    if b == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    Ok(a / b)
}

/// Computes `a * b * c / d`, multiplying before dividing and flooring the result.
///
/// The product is held in a [`U256`]. Fails if the product exceeds 256 bits
/// or the quotient does not fit in a `u128`.
pub fn safe_mul3_div(a: u128, b: u128, c: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return safe_div(a, d);
    }
    let overflow = || Error::overflow(format!("{} * {} * {} / {}", a, b, c, d));

    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .and_then(|ab| ab.checked_mul(U256::from(c)))
        .ok_or_else(overflow)?;
    let quotient = product / U256::from(d);
    if quotient > U256::from(u128::MAX) {
        return Err(overflow());
    }
    Ok(quotient.low_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert!(safe_add(u128::MAX, 1).is_err());

        assert_eq!(safe_sub(5, 3).unwrap(), 2);
        assert!(safe_sub(3, 5).is_err());

        assert_eq!(safe_mul(100, 200).unwrap(), 20_000);
        assert!(safe_mul(u128::MAX, 2).is_err());

        assert_eq!(safe_div(100, 10).unwrap(), 10);
        assert!(safe_div(100, 0).is_err());
    }

    #[test]
    fn test_mul_before_div_keeps_precision() {
        // (7 * 3 * 5) / 10 = 10, dividing first would give 0
        assert_eq!(safe_mul3_div(7, 3, 5, 10).unwrap(), 10);
    }

    #[test]
    fn test_mul3_div_wide_intermediate() {
        // a * b exceeds u128, the quotient does not
        assert_eq!(safe_mul3_div(u128::MAX, 4, 1, 8).unwrap(), u128::MAX / 2);
        assert_eq!(safe_mul3_div(u128::MAX, u128::MAX, 1, u128::MAX).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul3_div_overflow() {
        // quotient too wide
        let err = safe_mul3_div(u128::MAX / 2, 3, 1, 1).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));

        // product too wide
        let err = safe_mul3_div(u128::MAX, u128::MAX, u128::MAX, u128::MAX).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));

        assert!(safe_mul3_div(1, 1, 1, 0).is_err());
    }
}

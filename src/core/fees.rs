//! Linear holding-fee math.
//!
//! Pure functions, no state. The fee on a balance grows linearly with time:
//!
//! ```text
//! fee = principal * elapsed_seconds * fee_per_second / 10^18
//! ```
//!
//! The product is formed before the division so precision is kept, and the
//! division floors, so the fee a user pays is never rounded up. Any overflow
//! or underflow is an error; nothing here clamps or wraps.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::FEE_SCALE;
use crate::utils::math::{safe_add, safe_mul3_div, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// ACCRUAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Fee accrued on one record between its last mutation and now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Accrual {
    /// Seconds since the record was last touched
    pub elapsed: u64,
    /// Fee accrued over `elapsed`
    pub fee: u128,
}

impl Accrual {
    /// No time elapsed, no fee
    pub const NONE: Self = Self { elapsed: 0, fee: 0 };
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEE FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fee accrued on `principal` over `elapsed_seconds` at `fee_per_second` (10^18 scale).
///
/// The product `principal * elapsed * fee_per_second` is formed in 256 bits.
/// Fails with [`Error::ArithmeticOverflow`] only when the floored fee does
/// not fit in a `u128`.
pub fn accrued_fee(principal: u128, elapsed_seconds: u64, fee_per_second: u128) -> Result<u128> {
    safe_mul3_div(principal, u128::from(elapsed_seconds), fee_per_second, FEE_SCALE).map_err(
        |_| {
            Error::overflow(format!(
                "accrued_fee({}, {}, {})",
                principal, elapsed_seconds, fee_per_second
            ))
        },
    )
}

/// Fee accrued on `principal` since `last_timestamp`, evaluated at `now`.
///
/// A `last_timestamp` in the future is an underflow and fails.
pub fn fees_since(last_timestamp: u64, now: u64, principal: u128, fee_per_second: u128) -> Result<u128> {
    let elapsed = now.checked_sub(last_timestamp).ok_or_else(|| {
        Error::overflow(format!("fees_since: {} - {}", now, last_timestamp))
    })?;
    accrued_fee(principal, elapsed, fee_per_second)
}

/// Balance after a deposit: `amount + deposit - fee`
pub fn apply_deposit(amount: u128, deposit: u128, fee: u128) -> Result<u128> {
    safe_sub(safe_add(amount, deposit)?, fee)
}

/// Balance after a withdrawal: `amount - withdrawal - fee`.
///
/// This is the only over-withdrawal check: it fails when
/// `withdrawal + fee > amount`.
pub fn apply_withdrawal(amount: u128, withdrawal: u128, fee: u128) -> Result<u128> {
    safe_sub(safe_sub(amount, withdrawal)?, fee)
}

/// Balance after sweeping `fee` to the operator: `amount - fee`
pub fn apply_fee_collection(amount: u128, fee: u128) -> Result<u128> {
    safe_sub(amount, fee)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{DEFAULT_FEE_PER_SECOND, SECONDS_PER_DAY};
    use proptest::prelude::*;

    const UNIT: u128 = 1_000_000_000_000_000_000;

    /// One to five basis points per day
    fn daily_bp_rates() -> Vec<u128> {
        (1..6u128).map(|i| i * UNIT / 10_000 / 86_400).collect()
    }

    #[test]
    fn test_accrued_fee_matches_formula() {
        let now = 1_672_301_776u64;
        let mut timestamp = now;
        let mut timestamps = Vec::new();
        for i in 0..5u64 {
            timestamps.push(timestamp);
            timestamp -= i * 100_000;
        }

        let mut amounts = Vec::new();
        let mut amount = 1000 * UNIT;
        for _ in 0..5 {
            amounts.push(amount);
            amount *= 3;
        }

        for ts in &timestamps {
            for amount in &amounts {
                for rate in daily_bp_rates() {
                    // amounts are whole units, so dividing by UNIT first is exact
                    let expected = amount / UNIT * u128::from(now - ts) * rate;
                    assert_eq!(fees_since(*ts, now, *amount, rate).unwrap(), expected);
                }
            }
        }
    }

    #[test]
    fn test_fees_since_future_timestamp_fails() {
        let err = fees_since(1_924_763_962, 1_672_301_776, 1000 * UNIT, DEFAULT_FEE_PER_SECOND)
            .unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_accrued_fee_overflow() {
        let err = accrued_fee(u128::MAX, 2, UNIT).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));

        let err = accrued_fee(u128::MAX, u64::MAX, u128::MAX).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_ten_thousand_units_for_a_year() {
        let principal = 10_000 * UNIT;
        let year = 365 * SECONDS_PER_DAY;
        // principal * year * rate is past u128::MAX
        assert!(principal
            .checked_mul(u128::from(year))
            .and_then(|p| p.checked_mul(DEFAULT_FEE_PER_SECOND))
            .is_none());

        let fee = accrued_fee(principal, year, DEFAULT_FEE_PER_SECOND).unwrap();
        assert_eq!(fee, 10_000 * u128::from(year) * DEFAULT_FEE_PER_SECOND);
        // about 3.65% of the principal
        assert!(fee > principal / 28 && fee < principal / 27);
    }

    #[test]
    fn test_billion_tokens_for_a_day() {
        let principal = 1_000_000_000 * UNIT;
        let fee = accrued_fee(principal, SECONDS_PER_DAY, DEFAULT_FEE_PER_SECOND).unwrap();
        assert_eq!(
            fee,
            1_000_000_000 * u128::from(SECONDS_PER_DAY) * DEFAULT_FEE_PER_SECOND
        );
    }

    #[test]
    fn test_accrued_fee_rounds_down() {
        // 1 * 1 * (10^18 - 1) / 10^18 floors to zero
        assert_eq!(accrued_fee(1, 1, UNIT - 1).unwrap(), 0);
        assert_eq!(accrued_fee(3, 1, UNIT / 2).unwrap(), 1);
    }

    #[test]
    fn test_one_day_default_rate() {
        let principal = 2 * UNIT;
        let fee = accrued_fee(principal, SECONDS_PER_DAY + 1, DEFAULT_FEE_PER_SECOND).unwrap();
        assert_eq!(fee, principal * 86_401 * DEFAULT_FEE_PER_SECOND / UNIT);
        // roughly 1 bp of the principal
        assert!(fee > principal / 10_001 && fee < principal / 9_999);
    }

    #[test]
    fn test_updated_amounts() {
        let mut initial = Vec::new();
        let mut amount = 1000 * UNIT;
        for _ in 0..5 {
            initial.push(amount);
            amount *= 3;
        }
        let mut updates = Vec::new();
        let mut update = 100 * UNIT;
        for _ in 0..5 {
            updates.push(update);
            update *= 2;
        }
        let mut fees = Vec::new();
        let mut fee = UNIT;
        for _ in 0..5 {
            fees.push(fee);
            fee *= 3;
        }

        for a in &initial {
            for f in &fees {
                assert_eq!(apply_fee_collection(*a, *f).unwrap(), a - f);
                for u in &updates {
                    assert_eq!(apply_deposit(*a, *u, *f).unwrap(), a + u - f);
                    if *a >= u + f {
                        assert_eq!(apply_withdrawal(*a, *u, *f).unwrap(), a - u - f);
                    } else {
                        assert!(apply_withdrawal(*a, *u, *f).is_err());
                    }
                }
            }
        }
    }

    #[test]
    fn test_withdrawal_underflow_is_arithmetic_error() {
        let err = apply_withdrawal(10, 8, 3).unwrap_err();
        assert!(matches!(err, Error::ArithmeticOverflow { .. }));
        assert_eq!(apply_withdrawal(10, 7, 3).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_zero_elapsed_accrues_nothing(principal in any::<u128>(), rate in any::<u128>()) {
            prop_assert_eq!(accrued_fee(principal, 0, rate).unwrap(), 0);
        }

        #[test]
        fn prop_fee_is_linear_floor(
            principal in 0u128..1_000 * UNIT,
            elapsed in 0u64..10_000_000,
            rate in 0u128..10_000_000_000,
        ) {
            let fee = accrued_fee(principal, elapsed, rate).unwrap();
            let exact = principal * u128::from(elapsed) * rate;
            prop_assert!(fee * UNIT <= exact);
            prop_assert!(exact < (fee + 1) * UNIT);
        }

        #[test]
        fn prop_fee_monotonic_in_time(
            principal in 0u128..100_000 * UNIT,
            a in 0u64..1_000_000,
            b in 0u64..1_000_000,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let fee_lo = accrued_fee(principal, lo, DEFAULT_FEE_PER_SECOND).unwrap();
            let fee_hi = accrued_fee(principal, hi, DEFAULT_FEE_PER_SECOND).unwrap();
            prop_assert!(fee_lo <= fee_hi);
        }

        #[test]
        fn prop_deposit_then_withdraw_restores(amount in 0u128..u64::MAX as u128, deposit in 1u128..u64::MAX as u128) {
            let after = apply_deposit(amount, deposit, 0).unwrap();
            prop_assert_eq!(apply_withdrawal(after, deposit, 0).unwrap(), amount);
        }
    }
}

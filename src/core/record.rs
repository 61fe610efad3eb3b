//! Balance records.
//!
//! A [`BalanceRecord`] is kept per `(user, asset)` and per `asset` (the
//! aggregate over all users). Transitions are pure: each returns the updated
//! record and leaves `self` alone, so a caller can stage several updates and
//! commit them together or not at all.

use serde::{Deserialize, Serialize};

use crate::core::fees::{
    accrued_fee, apply_deposit, apply_fee_collection, apply_withdrawal, Accrual,
};
use crate::error::{Error, Result};
use crate::utils::math::safe_add;

/// Principal, uncollected fee and last-mutation time for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// Net principal, already reduced by every fee folded so far
    pub amount: u128,
    /// Fee accrued since the last collection for this key
    pub fee: u128,
    /// Unix time of the last mutation
    pub timestamp: u64,
}

/// Outcome of a fee collection on an aggregate record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    /// Record after the sweep
    pub record: BalanceRecord,
    /// Fee accrued during this call
    pub accrual: Accrual,
    /// Total handed to the receiver (earlier uncollected fee plus `accrual.fee`)
    pub collected: u128,
}

impl BalanceRecord {
    /// A record nobody has touched yet
    pub const EMPTY: Self = Self {
        amount: 0,
        fee: 0,
        timestamp: 0,
    };

    /// Whether the record is still in its initial state
    pub fn is_untouched(&self) -> bool {
        self.amount == 0 && self.timestamp == 0
    }

    /// Seconds since the last mutation; zero for an untouched record
    pub fn elapsed(&self, now: u64) -> Result<u64> {
        if self.is_untouched() {
            return Ok(0);
        }
        now.checked_sub(self.timestamp)
            .ok_or_else(|| Error::overflow(format!("elapsed: {} - {}", now, self.timestamp)))
    }

    /// Fee accrued on the current principal up to `now`
    pub fn accrue(&self, now: u64, fee_per_second: u128) -> Result<Accrual> {
        let elapsed = self.elapsed(now)?;
        let fee = accrued_fee(self.amount, elapsed, fee_per_second)?;
        Ok(Accrual { elapsed, fee })
    }

    /// Largest amount a withdrawal at `now` could take; zero once the
    /// accrued fee has eaten the whole principal
    pub fn withdrawable(&self, now: u64, fee_per_second: u128) -> Result<u128> {
        let accrual = self.accrue(now, fee_per_second)?;
        Ok(self.amount.saturating_sub(accrual.fee))
    }

    /// Record after depositing `deposit` at `now`
    pub fn deposit(&self, deposit: u128, now: u64, fee_per_second: u128) -> Result<(Self, Accrual)> {
        let accrual = self.accrue(now, fee_per_second)?;
        let record = Self {
            amount: apply_deposit(self.amount, deposit, accrual.fee)?,
            fee: safe_add(self.fee, accrual.fee)?,
            timestamp: now,
        };
        Ok((record, accrual))
    }

    /// Record after withdrawing `withdrawal` at `now`.
    ///
    /// Fails with an arithmetic error when the fee-adjusted balance cannot
    /// cover the withdrawal.
    pub fn withdraw(
        &self,
        withdrawal: u128,
        now: u64,
        fee_per_second: u128,
    ) -> Result<(Self, Accrual)> {
        let accrual = self.accrue(now, fee_per_second)?;
        let record = Self {
            amount: apply_withdrawal(self.amount, withdrawal, accrual.fee)?,
            fee: safe_add(self.fee, accrual.fee)?,
            timestamp: now,
        };
        Ok((record, accrual))
    }

    /// Record after sweeping every uncollected fee at `now`.
    ///
    /// Only the freshly accrued part is taken out of `amount`; fees accrued
    /// by earlier mutations were deducted when they were folded in.
    pub fn collect(&self, now: u64, fee_per_second: u128) -> Result<Collection> {
        let accrual = self.accrue(now, fee_per_second)?;
        let collected = safe_add(self.fee, accrual.fee)?;
        let record = Self {
            amount: apply_fee_collection(self.amount, accrual.fee)?,
            fee: 0,
            timestamp: now,
        };
        Ok(Collection {
            record,
            accrual,
            collected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{DEFAULT_FEE_PER_SECOND, FEE_SCALE};

    const RATE: u128 = DEFAULT_FEE_PER_SECOND;

    #[test]
    fn test_first_deposit_activates_record() {
        let (record, accrual) = BalanceRecord::EMPTY.deposit(3 * FEE_SCALE, 1_000, RATE).unwrap();
        assert_eq!(accrual, Accrual::NONE);
        assert_eq!(record.amount, 3 * FEE_SCALE);
        assert_eq!(record.fee, 0);
        assert_eq!(record.timestamp, 1_000);
        assert!(!record.is_untouched());
    }

    #[test]
    fn test_subsequent_deposit_folds_fee() {
        let (first, _) = BalanceRecord::EMPTY.deposit(3 * FEE_SCALE, 1_000, RATE).unwrap();
        let (second, accrual) = first.deposit(FEE_SCALE, 1_100, RATE).unwrap();

        let expected_fee = 3 * FEE_SCALE * 100 * RATE / FEE_SCALE;
        assert_eq!(accrual.elapsed, 100);
        assert_eq!(accrual.fee, expected_fee);
        assert_eq!(second.amount, 4 * FEE_SCALE - expected_fee);
        assert_eq!(second.fee, expected_fee);
        assert_eq!(second.timestamp, 1_100);
    }

    #[test]
    fn test_withdraw_from_untouched_fails() {
        assert!(BalanceRecord::EMPTY.withdraw(1, 5_000, RATE).is_err());
    }

    #[test]
    fn test_withdraw_ceiling() {
        let (record, _) = BalanceRecord::EMPTY.deposit(2 * FEE_SCALE, 1_000, RATE).unwrap();
        let now = 1_000 + 86_401;
        let max = record.withdrawable(now, RATE).unwrap();

        assert!(record.withdraw(max + 1, now, RATE).is_err());
        let (after, _) = record.withdraw(max, now, RATE).unwrap();
        assert_eq!(after.amount, 0);
        assert_eq!(after.fee, 2 * FEE_SCALE - max);
    }

    #[test]
    fn test_collect_resets_fee_and_deducts_fresh_part_only() {
        let (record, _) = BalanceRecord::EMPTY.deposit(3 * FEE_SCALE, 1_000, RATE).unwrap();
        let (record, first) = record.deposit(FEE_SCALE, 2_000, RATE).unwrap();
        let amount_before = record.amount;

        let collection = record.collect(3_000, RATE).unwrap();
        assert_eq!(collection.accrual.fee, amount_before * 1_000 * RATE / FEE_SCALE);
        assert_eq!(collection.collected, first.fee + collection.accrual.fee);
        assert_eq!(collection.record.amount, amount_before - collection.accrual.fee);
        assert_eq!(collection.record.fee, 0);
        assert_eq!(collection.record.timestamp, 3_000);
    }

    #[test]
    fn test_time_going_backwards_fails() {
        let (record, _) = BalanceRecord::EMPTY.deposit(1, 1_000, RATE).unwrap();
        assert!(record.accrue(999, RATE).is_err());
    }

    #[test]
    fn test_transitions_leave_self_untouched() {
        let (record, _) = BalanceRecord::EMPTY.deposit(10, 1_000, RATE).unwrap();
        let copy = record;
        let _ = record.withdraw(100, 2_000, RATE);
        let _ = record.deposit(5, 2_000, RATE);
        assert_eq!(record, copy);
    }
}

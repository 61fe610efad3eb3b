//! Ledger operations - atomic state changes.
//!
//! Operations are plain data describing one call into the ledger: who makes
//! it and with which arguments. The ledger executes them atomically and
//! identifies each by the SHA-256 of its bincode encoding.

use serde::{Deserialize, Serialize};

use crate::core::asset::Asset;
use crate::core::fees::Accrual;
use crate::core::record::BalanceRecord;
use crate::error::Result;
use crate::utils::crypto::{Address, Hash};

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for ledger operations
pub trait Operation: Serialize + Sized + Send + Sync {
    /// Get the operation type name
    fn operation_type(&self) -> &'static str;

    /// Get the identity making the call
    fn caller(&self) -> Address;
}

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCE OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Deposit an asset into the safe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOp {
    /// Depositor
    pub caller: Address,
    /// Asset to deposit
    pub asset: Asset,
    /// Amount to deposit
    pub amount: u128,
    /// Native value attached to the call
    pub value: u128,
}

impl DepositOp {
    /// Native deposit with the matching value attached
    pub fn native(caller: Address, amount: u128) -> Self {
        Self {
            caller,
            asset: Asset::Native,
            amount,
            value: amount,
        }
    }

    /// Token deposit with no value attached
    pub fn token(caller: Address, token: Address, amount: u128) -> Self {
        Self {
            caller,
            asset: Asset::Token(token),
            amount,
            value: 0,
        }
    }
}

impl Operation for DepositOp {
    fn operation_type(&self) -> &'static str {
        "Deposit"
    }

    fn caller(&self) -> Address {
        self.caller
    }
}

/// Result of a deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositResult {
    /// Caller's record after the deposit
    pub record: BalanceRecord,
    /// Fee folded into the caller's record by this call
    pub accrual: Accrual,
    /// Operation hash
    pub tx_hash: Hash,
}

/// Withdraw an asset from the safe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawOp {
    /// Withdrawing user
    pub caller: Address,
    /// Asset to withdraw
    pub asset: Asset,
    /// Amount to pay out
    pub amount: u128,
}

impl Operation for WithdrawOp {
    fn operation_type(&self) -> &'static str {
        "Withdraw"
    }

    fn caller(&self) -> Address {
        self.caller
    }
}

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawResult {
    /// Amount paid out
    pub withdrawn: u128,
    /// Caller's record after the withdrawal
    pub record: BalanceRecord,
    /// Fee folded into the caller's record by this call
    pub accrual: Accrual,
    /// Operation hash
    pub tx_hash: Hash,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OWNER OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Sweep accrued fees for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectFeesOp {
    /// Caller, must be the owner
    pub caller: Address,
    /// Asset to collect fees in
    pub asset: Asset,
    /// Address the fees are sent to
    pub receiver: Address,
}

impl Operation for CollectFeesOp {
    fn operation_type(&self) -> &'static str {
        "CollectFees"
    }

    fn caller(&self) -> Address {
        self.caller
    }
}

/// Result of a fee collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectFeesResult {
    /// Amount sent to the receiver
    pub collected: u128,
    /// Aggregate record after the sweep
    pub record: BalanceRecord,
    /// Operation hash
    pub tx_hash: Hash,
}

/// Hand ownership to another address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOwnershipOp {
    /// Caller, must be the owner
    pub caller: Address,
    /// New owner
    pub new_owner: Address,
}

impl Operation for TransferOwnershipOp {
    fn operation_type(&self) -> &'static str {
        "TransferOwnership"
    }

    fn caller(&self) -> Address {
        self.caller
    }
}

/// Result of an ownership transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOwnershipResult {
    /// Previous owner
    pub previous: Address,
    /// New owner
    pub new_owner: Address,
    /// Operation hash
    pub tx_hash: Hash,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// All possible ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOperation {
    /// Deposit
    Deposit(DepositOp),
    /// Withdraw
    Withdraw(WithdrawOp),
    /// Collect fees
    CollectFees(CollectFeesOp),
    /// Transfer ownership
    TransferOwnership(TransferOwnershipOp),
}

impl LedgerOperation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Deposit(op) => op.operation_type(),
            Self::Withdraw(op) => op.operation_type(),
            Self::CollectFees(op) => op.operation_type(),
            Self::TransferOwnership(op) => op.operation_type(),
        }
    }

    /// Get the caller
    pub fn caller(&self) -> Address {
        match self {
            Self::Deposit(op) => op.caller,
            Self::Withdraw(op) => op.caller,
            Self::CollectFees(op) => op.caller,
            Self::TransferOwnership(op) => op.caller,
        }
    }

    /// Hash identifying this operation
    pub fn hash(&self) -> Result<Hash> {
        Hash::of(self)
    }
}

impl From<DepositOp> for LedgerOperation {
    fn from(op: DepositOp) -> Self {
        Self::Deposit(op)
    }
}

impl From<WithdrawOp> for LedgerOperation {
    fn from(op: WithdrawOp) -> Self {
        Self::Withdraw(op)
    }
}

impl From<CollectFeesOp> for LedgerOperation {
    fn from(op: CollectFeesOp) -> Self {
        Self::CollectFees(op)
    }
}

impl From<TransferOwnershipOp> for LedgerOperation {
    fn from(op: TransferOwnershipOp) -> Self {
        Self::TransferOwnership(op)
    }
}

/// Result of any ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// Deposit result
    Deposit(DepositResult),
    /// Withdraw result
    Withdraw(WithdrawResult),
    /// Collect fees result
    CollectFees(CollectFeesResult),
    /// Transfer ownership result
    TransferOwnership(TransferOwnershipResult),
}

impl OperationResult {
    /// Hash of the operation that produced this result
    pub fn tx_hash(&self) -> Hash {
        match self {
            Self::Deposit(r) => r.tx_hash,
            Self::Withdraw(r) => r.tx_hash,
            Self::CollectFees(r) => r.tx_hash,
            Self::TransferOwnership(r) => r.tx_hash,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_types() {
        let alice = Address::from_low_u64(1);
        let op = DepositOp::native(alice, 5);
        assert_eq!(op.operation_type(), "Deposit");
        assert_eq!(op.value, 5);

        let op = LedgerOperation::from(WithdrawOp {
            caller: alice,
            asset: Asset::Native,
            amount: 1,
        });
        assert_eq!(op.operation_type(), "Withdraw");
        assert_eq!(op.caller(), alice);
    }

    #[test]
    fn test_operation_hash_distinguishes_arguments() {
        let alice = Address::from_low_u64(1);
        let token = Address::from_low_u64(99);
        let a = LedgerOperation::from(DepositOp::token(alice, token, 10));
        let b = LedgerOperation::from(DepositOp::token(alice, token, 11));

        assert_eq!(a.hash().unwrap(), a.clone().hash().unwrap());
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }
}

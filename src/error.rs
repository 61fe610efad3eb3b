//! Error types for the Digital Safe ledger.
//!
//! Every failure is synchronous and all-or-nothing: when an operation returns
//! one of these errors, no balance record, owner or event has changed.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Input Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Deposit amount is zero
    #[error("Invalid deposit amount")]
    InvalidDepositAmount,

    /// Attached native value does not match the deposit
    #[error("Invalid amount sent: expected {expected}, got {sent}")]
    InvalidAmountSent {
        /// Value the deposit requires
        expected: u128,
        /// Value actually attached to the call
        sent: u128,
    },

    /// Withdrawal amount is zero
    #[error("Invalid withdraw amount")]
    InvalidWithdrawAmount,

    /// Withdrawal exceeds the fee-adjusted balance
    #[error("Invalid withdrawal: requested {requested}, available {available}")]
    InvalidWithdrawal {
        /// Requested amount
        requested: u128,
        /// Fee-adjusted balance at the time of the call
        available: u128,
    },

    /// Fee receiver is the null address
    #[error("Invalid fee collection address")]
    InvalidFeeCollectionAddress,

    /// Nothing is held for the asset
    #[error("No deposits for token {0}")]
    NoDepositsForToken(String),

    /// Caller is not the ledger owner
    #[error("Caller {0} is not the owner")]
    NotOwner(String),

    /// New owner is the null address
    #[error("New owner is the zero address")]
    InvalidOwnerAddress,

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Overflow or underflow in fee or balance computation
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that overflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Transfer Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Native currency transfer was rejected by the recipient.
    ///
    /// The on-chain safe reports this as `ETHTransferFailed`.
    #[error("Native currency transfer failed")]
    NativeTransferFailed,

    /// Token transfer or transferFrom failed
    #[error("Token transfer failed: {reason}")]
    TokenTransferFailed {
        /// Failure reported by the token
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Execution Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A guarded operation was entered while another one is in progress
    #[error("Reentrant call")]
    ReentrantCall,

    /// Block timestamp moved backwards
    #[error("Timestamp regression: current {current}, requested {requested}")]
    TimestampRegression {
        /// Current block timestamp
        current: u64,
        /// Requested block timestamp
        requested: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for an arithmetic failure in `operation`
    pub fn overflow(operation: impl Into<String>) -> Self {
        Error::ArithmeticOverflow {
            operation: operation.into(),
        }
    }

    /// Returns true if the caller can retry after fixing its input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidDepositAmount
                | Error::InvalidAmountSent { .. }
                | Error::InvalidWithdrawAmount
                | Error::InvalidWithdrawal { .. }
                | Error::InvalidFeeCollectionAddress
                | Error::NoDepositsForToken(_)
                | Error::InvalidOwnerAddress
                | Error::InvalidParameter { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Internal(_) | Error::Storage(_) | Error::ArithmeticOverflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Validation errors: 1xxx
            Error::InvalidDepositAmount => 1001,
            Error::InvalidAmountSent { .. } => 1002,
            Error::InvalidWithdrawAmount => 1003,
            Error::InvalidWithdrawal { .. } => 1004,
            Error::InvalidFeeCollectionAddress => 1005,
            Error::NoDepositsForToken(_) => 1006,
            Error::NotOwner(_) => 1007,
            Error::InvalidOwnerAddress => 1008,
            Error::InvalidParameter { .. } => 1009,

            // Arithmetic errors: 2xxx
            Error::ArithmeticOverflow { .. } => 2001,

            // Transfer errors: 3xxx
            Error::NativeTransferFailed => 3001,
            Error::TokenTransferFailed { .. } => 3002,

            // Execution errors: 4xxx
            Error::ReentrantCall => 4001,
            Error::TimestampRegression { .. } => 4002,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
            Error::Storage(_) => 9002,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::InvalidDepositAmount.code(),
            Error::InvalidAmountSent { expected: 0, sent: 0 }.code(),
            Error::InvalidWithdrawAmount.code(),
            Error::InvalidWithdrawal { requested: 0, available: 0 }.code(),
            Error::InvalidFeeCollectionAddress.code(),
            Error::NoDepositsForToken("".into()).code(),
            Error::NotOwner("".into()).code(),
            Error::InvalidOwnerAddress.code(),
            Error::overflow("").code(),
            Error::NativeTransferFailed.code(),
            Error::TokenTransferFailed { reason: "".into() }.code(),
            Error::ReentrantCall.code(),
            Error::TimestampRegression { current: 0, requested: 0 }.code(),
            Error::Internal("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidWithdrawal {
            requested: 3,
            available: 2,
        };
        assert_eq!(err.to_string(), "Invalid withdrawal: requested 3, available 2");

        let err = Error::overflow("accrued_fee");
        assert_eq!(err.to_string(), "Arithmetic overflow in accrued_fee");

        assert_eq!(Error::NativeTransferFailed.to_string(), "Native currency transfer failed");
        assert_eq!(Error::NativeTransferFailed.code(), 3001);
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidDepositAmount.is_recoverable());
        assert!(!Error::ReentrantCall.is_recoverable());
        assert!(Error::overflow("x").is_critical());
        assert!(!Error::NotOwner("0x00".into()).is_critical());
    }
}

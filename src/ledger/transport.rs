//! Asset transfer boundary.
//!
//! The ledger never moves value itself. After it has committed its records it
//! asks an [`AssetTransport`] to pull a deposit in or push a withdrawal out.
//! Both calls receive the ledger, because whatever sits on the other side of a
//! transfer may try to call back into it.

use crate::core::asset::Asset;
use crate::error::{Error, Result};
use crate::ledger::state_machine::Ledger;
use crate::utils::crypto::Address;

/// Moves assets between holders and the ledger's custody
pub trait AssetTransport {
    /// Pull `amount` of `asset` from `from` into custody
    fn receive(&mut self, ledger: &mut Ledger, asset: Asset, from: Address, amount: u128) -> Result<()>;

    /// Push `amount` of `asset` from custody to `to`
    fn send(&mut self, ledger: &mut Ledger, asset: Asset, to: Address, amount: u128) -> Result<()>;
}

/// Normalize a transport failure to the error reported for `asset`
pub(crate) fn transfer_error(asset: Asset, err: Error) -> Error {
    match (asset, err) {
        (Asset::Native, _) => Error::NativeTransferFailed,
        (Asset::Token(_), err @ Error::TokenTransferFailed { .. }) => err,
        (Asset::Token(_), err) => Error::TokenTransferFailed {
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_mapping() {
        assert_eq!(
            transfer_error(Asset::Native, Error::ReentrantCall),
            Error::NativeTransferFailed
        );

        let token = Asset::Token(Address::from_low_u64(1));
        let failure = Error::TokenTransferFailed {
            reason: "insufficient allowance".into(),
        };
        assert_eq!(transfer_error(token, failure.clone()), failure);
        assert_eq!(
            transfer_error(token, Error::ReentrantCall),
            Error::TokenTransferFailed {
                reason: "Reentrant call".into()
            }
        );
    }
}

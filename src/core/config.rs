//! Ledger configuration.
//!
//! Parameters fixed when a ledger is created:
//! - The holding fee rate
//! - The initial owner (the only identity allowed to collect fees)
//! - The custody address the safe holds assets under

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::crypto::Address;

/// Configuration a ledger is created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Fee per second per unit of principal, scaled by 10^18
    pub fee_per_second: u128,

    /// Initial owner, empowered to collect fees
    pub owner: Address,

    /// Address the safe itself holds custody under
    pub custody: Address,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fee_per_second: DEFAULT_FEE_PER_SECOND,
            owner: Address::ZERO,
            custody: Address::new(DEFAULT_CUSTODY_ADDRESS),
        }
    }
}

impl LedgerConfig {
    /// Create a configuration owned by `owner` with default rate and custody
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    /// Override the fee rate
    pub fn with_fee_per_second(mut self, fee_per_second: u128) -> Self {
        self.fee_per_second = fee_per_second;
        self
    }

    /// Override the custody address
    pub fn with_custody(mut self, custody: Address) -> Self {
        self.custody = custody;
        self
    }

    /// Rate as a fraction of principal per day, in basis points (display only)
    pub fn daily_rate_bps(&self) -> f64 {
        self.fee_per_second as f64 * SECONDS_PER_DAY as f64 * BPS_DIVISOR as f64
            / FEE_SCALE as f64
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(Error::InvalidParameter {
                name: "owner".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        if self.custody.is_zero() || self.custody == Address::new(NATIVE_ASSET_ADDRESS) {
            return Err(Error::InvalidParameter {
                name: "custody".into(),
                reason: "must be a regular, non-zero address".into(),
            });
        }
        if self.custody == self.owner {
            return Err(Error::InvalidParameter {
                name: "custody".into(),
                reason: "cannot equal the owner".into(),
            });
        }
        // A rate of 100% per second or more drains any balance within one block.
        if self.fee_per_second >= FEE_SCALE {
            return Err(Error::InvalidParameter {
                name: "fee_per_second".into(),
                reason: format!("must be below {}", FEE_SCALE),
            });
        }
        Ok(())
    }
}

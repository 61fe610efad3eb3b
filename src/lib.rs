//! # Digital Safe
//!
//! A multi-asset custodial ledger. Users deposit the native currency or any
//! fungible token and withdraw it later; while assets sit in the safe they
//! pay a holding fee that grows linearly with time, which the owner sweeps
//! to a receiver of their choice.
//!
//! ## Architecture
//!
//! - **Core**: Assets, balance records and the linear fee math
//! - **Ledger**: State machine, reentrancy guard, events and asset transport
//! - **Storage**: Key-value persistence of ledgers, balances and history
//! - **CLI**: Operator tooling over a local data directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use digital_safe::prelude::*;
//!
//! let mut ledger = Ledger::new(LedgerConfig::new(owner))?;
//! let mut bank = InMemoryBank::new(ledger.custody());
//! bank.mint(Asset::Native, alice, 10)?;
//!
//! ledger.begin_block(1, 1_700_000_000)?;
//! ledger.deposit(alice, Asset::Native, 10, 10, &mut bank)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        asset::Asset,
        config::LedgerConfig,
        fees::{accrued_fee, Accrual},
        record::BalanceRecord,
    };
    pub use crate::error::{Error, Result};
    pub use crate::ledger::{
        bank::InMemoryBank,
        events::{EventLog, LedgerEvent},
        operations::{LedgerOperation, OperationResult},
        state_machine::Ledger,
        transport::AssetTransport,
    };
    pub use crate::utils::{
        constants::{DEFAULT_FEE_PER_SECOND, FEE_SCALE},
        crypto::{Address, Hash},
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "Digital Safe";

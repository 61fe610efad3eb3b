//! Utility modules for the Digital Safe ledger.
//!
//! This module contains shared utilities:
//! - Identities and hashes
//! - Checked arithmetic
//! - Constants

pub mod constants;
pub mod crypto;
pub mod math;

pub use constants::*;
pub use crypto::*;
pub use math::*;

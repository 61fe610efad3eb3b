//! Core modules for the Digital Safe ledger.
//!
//! This module contains the fundamental building blocks:
//! - Asset identifiers
//! - Balance records and their transitions
//! - Linear holding-fee math
//! - Ledger configuration

pub mod asset;
pub mod config;
pub mod fees;
pub mod record;

pub use asset::*;
pub use config::*;
pub use fees::*;
pub use record::*;

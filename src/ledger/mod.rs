//! Ledger module - the custodial state machine and its boundaries.
//!
//! This module provides the ledger that tracks every deposit, accrues the
//! holding fee and sequences transfers through a pluggable transport.

pub mod bank;
pub mod events;
pub mod guard;
pub mod operations;
pub mod state_machine;
pub mod transport;

pub use bank::*;
pub use events::*;
pub use guard::*;
pub use operations::*;
pub use state_machine::*;
pub use transport::*;

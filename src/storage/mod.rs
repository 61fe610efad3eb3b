//! Storage module for persistent data management.
//!
//! This module persists everything the ledger needs across runs:
//! - Per-user and aggregate balance records
//! - Ledger meta (configuration, owner, last block)
//! - The local bank's balance sheet
//! - Event history
//!
//! ## Backends
//!
//! - **InMemoryStore**: Fast, ephemeral storage for testing
//! - **FileStore**: JSON file-based persistence
//!
//! ## Usage
//!
//! ```rust,ignore
//! use digital_safe::storage::{FileStore, LedgerStore};
//!
//! let store = LedgerStore::new(FileStore::new("./safe-data")?);
//! if let Some(ledger) = store.load_ledger()? {
//!     println!("owner: {}", ledger.owner());
//! }
//! ```

pub mod backend;
pub mod state;

pub use backend::*;
pub use state::*;

//! Ledger persistence.
//!
//! [`LedgerStore`] maps a [`Ledger`] and the local bank onto prefixed keys of
//! any [`StorageBackend`]:
//!
//! | key                              | value            |
//! |----------------------------------|------------------|
//! | `meta:ledger`                    | [`LedgerMeta`]   |
//! | `usr:` + user + asset address    | [`BalanceRecord`]|
//! | `tot:` + asset address           | [`BalanceRecord`]|
//! | `bank:balances`                  | [`Balances`]     |
//! | `evt:` + height (BE) + tx hash   | [`LedgerEvent`]  |

use sha2::{Digest, Sha256};

use crate::core::asset::Asset;
use crate::core::record::BalanceRecord;
use crate::error::{Error, Result};
use crate::ledger::bank::Balances;
use crate::ledger::events::{EventLog, LedgerEvent};
use crate::ledger::state_machine::{Ledger, LedgerMeta};
use crate::storage::backend::{make_key, prefixes, StorageBackend, TypedStore};
use crate::utils::constants::ADDRESS_LENGTH;
use crate::utils::crypto::{Address, Hash};

/// Prefix of persisted events
const EVENTS: &[u8] = b"evt:";

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Saves and restores ledgers on a storage backend
pub struct LedgerStore<B: StorageBackend> {
    /// Underlying storage
    store: TypedStore<B>,
}

impl<B: StorageBackend> LedgerStore<B> {
    /// Create a new ledger store
    pub fn new(backend: B) -> Self {
        Self {
            store: TypedStore::new(backend),
        }
    }

    fn meta_key() -> Vec<u8> {
        make_key(prefixes::META, &[&b"ledger"[..]])
    }

    fn bank_key() -> Vec<u8> {
        make_key(prefixes::BANK, &[&b"balances"[..]])
    }

    /// Whether a ledger has been saved here
    pub fn is_initialized(&self) -> Result<bool> {
        self.store.exists(&Self::meta_key())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGER
    // ═══════════════════════════════════════════════════════════════════════════

    /// Save every record and the meta of `ledger`, then flush
    pub fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        self.store.delete_prefix(prefixes::USER)?;
        self.store.delete_prefix(prefixes::TOTAL)?;

        for (user, asset, record) in ledger.user_records() {
            let key = make_key(
                prefixes::USER,
                &[&user.as_bytes()[..], &asset.address().as_bytes()[..]],
            );
            self.store.set(&key, &record)?;
        }
        for (asset, record) in ledger.total_records() {
            let key = make_key(prefixes::TOTAL, &[&asset.address().as_bytes()[..]]);
            self.store.set(&key, &record)?;
        }
        self.store.set(&Self::meta_key(), &ledger.meta())?;
        self.store.flush()
    }

    /// Load the saved ledger, if there is one
    pub fn load_ledger(&self) -> Result<Option<Ledger>> {
        let meta: LedgerMeta = match self.store.get(&Self::meta_key())? {
            Some(meta) => meta,
            None => return Ok(None),
        };

        let users = self
            .store
            .scan::<BalanceRecord>(prefixes::USER)?
            .into_iter()
            .map(|(key, record)| {
                let (user, rest) = split_address(&key)?;
                let (asset, rest) = split_address(rest)?;
                expect_end(rest)?;
                Ok((user, Asset::from_address(asset), record))
            })
            .collect::<Result<Vec<_>>>()?;

        let totals = self
            .store
            .scan::<BalanceRecord>(prefixes::TOTAL)?
            .into_iter()
            .map(|(key, record)| {
                let (asset, rest) = split_address(&key)?;
                expect_end(rest)?;
                Ok((Asset::from_address(asset), record))
            })
            .collect::<Result<Vec<_>>>()?;

        Ledger::from_parts(meta, users, totals).map(Some)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BANK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Save the balance sheet of the local bank
    pub fn save_bank(&self, balances: &Balances) -> Result<()> {
        self.store.set(&Self::bank_key(), balances)?;
        self.store.flush()
    }

    /// Load the balance sheet of the local bank; empty if never saved
    pub fn load_bank(&self) -> Result<Balances> {
        Ok(self.store.get(&Self::bank_key())?.unwrap_or_default())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENT HISTORY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append the events of a finished block to the history
    pub fn append_events(&self, events: &EventLog) -> Result<()> {
        for (index, event) in events.events().iter().enumerate() {
            let height = event.block_height().to_be_bytes();
            let index = (index as u32).to_be_bytes();
            let key = make_key(
                EVENTS,
                &[&height[..], &event.tx_hash().as_bytes()[..], &index[..]],
            );
            self.store.set(&key, event)?;
        }
        self.store.flush()
    }

    /// The most recent `limit` events, newest first
    pub fn recent_events(&self, limit: usize) -> Result<Vec<LedgerEvent>> {
        let mut events: Vec<LedgerEvent> = self
            .store
            .scan::<LedgerEvent>(EVENTS)?
            .into_iter()
            .map(|(_, event)| event)
            .collect();
        events.sort_by_key(|e| std::cmp::Reverse((e.block_height(), e.timestamp())));
        events.truncate(limit);
        Ok(events)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // UTILITY METHODS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Flush all pending writes
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Hash over every saved balance record and the meta, in key order
    pub fn compute_state_root(&self) -> Result<Hash> {
        let backend = self.store.backend();
        let mut hasher = Sha256::new();
        for prefix in [prefixes::META, prefixes::TOTAL, prefixes::USER] {
            for (key, value) in backend.scan_prefix(prefix)? {
                hasher.update((key.len() as u32).to_be_bytes());
                hasher.update(&key);
                hasher.update((value.len() as u32).to_be_bytes());
                hasher.update(&value);
            }
        }
        Ok(Hash::new(hasher.finalize().into()))
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}

fn split_address(bytes: &[u8]) -> Result<(Address, &[u8])> {
    if bytes.len() < ADDRESS_LENGTH {
        return Err(Error::Deserialization(format!(
            "Truncated record key: {} bytes",
            bytes.len()
        )));
    }
    let (head, rest) = bytes.split_at(ADDRESS_LENGTH);
    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(head);
    Ok((Address::new(address), rest))
}

fn expect_end(rest: &[u8]) -> Result<()> {
    if !rest.is_empty() {
        return Err(Error::Deserialization(format!(
            "Trailing {} bytes in record key",
            rest.len()
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

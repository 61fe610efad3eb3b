//! Ledger events.
//!
//! Every successful mutating operation appends one event to the ledger's
//! [`EventLog`]. The log is drained at the end of each block.

use serde::{Deserialize, Serialize};

use crate::core::asset::Asset;
use crate::utils::crypto::{Address, Hash};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All ledger event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Assets were deposited
    Deposited(DepositedEvent),
    /// Assets were withdrawn
    Withdrawal(WithdrawalEvent),
    /// Accrued fees were swept to a receiver
    FeeCollected(FeeCollectedEvent),
    /// Ownership moved to a new address
    OwnershipTransferred(OwnershipTransferredEvent),
}

impl LedgerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Deposited(_) => "Deposited",
            Self::Withdrawal(_) => "Withdrawal",
            Self::FeeCollected(_) => "FeeCollected",
            Self::OwnershipTransferred(_) => "OwnershipTransferred",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Deposited(e) => e.timestamp,
            Self::Withdrawal(e) => e.timestamp,
            Self::FeeCollected(e) => e.timestamp,
            Self::OwnershipTransferred(e) => e.timestamp,
        }
    }

    /// Get the block height of the event
    pub fn block_height(&self) -> u64 {
        match self {
            Self::Deposited(e) => e.block_height,
            Self::Withdrawal(e) => e.block_height,
            Self::FeeCollected(e) => e.block_height,
            Self::OwnershipTransferred(e) => e.block_height,
        }
    }

    /// Hash of the operation that emitted the event
    pub fn tx_hash(&self) -> Hash {
        match self {
            Self::Deposited(e) => e.tx_hash,
            Self::Withdrawal(e) => e.tx_hash,
            Self::FeeCollected(e) => e.tx_hash,
            Self::OwnershipTransferred(e) => e.tx_hash,
        }
    }

    /// Asset the event concerns, if any
    pub fn asset(&self) -> Option<Asset> {
        match self {
            Self::Deposited(e) => Some(e.asset),
            Self::Withdrawal(e) => Some(e.asset),
            Self::FeeCollected(e) => Some(e.asset),
            Self::OwnershipTransferred(_) => None,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCE EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a user deposits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositedEvent {
    /// Depositor
    pub user: Address,
    /// Deposited asset
    pub asset: Asset,
    /// Amount deposited
    pub amount: u128,
    /// User's principal after the deposit, net of fees
    pub new_amount: u128,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
    /// Operation hash
    pub tx_hash: Hash,
}

/// Event emitted when a user withdraws
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    /// Withdrawing user
    pub user: Address,
    /// Withdrawn asset
    pub asset: Asset,
    /// Amount paid out
    pub amount: u128,
    /// User's principal left behind
    pub new_amount: u128,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
    /// Operation hash
    pub tx_hash: Hash,
}

/// Event emitted when the owner sweeps fees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCollectedEvent {
    /// Asset the fees were collected in
    pub asset: Asset,
    /// Amount sent to the receiver
    pub amount: u128,
    /// Fee receiver
    pub receiver: Address,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
    /// Operation hash
    pub tx_hash: Hash,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OWNERSHIP EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when ownership changes hands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferredEvent {
    /// Previous owner
    pub previous: Address,
    /// New owner
    pub new_owner: Address,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
    /// Operation hash
    pub tx_hash: Hash,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Collection of events from an operation or block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&LedgerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the most recent event
    pub fn last(&self) -> Option<&LedgerEvent> {
        self.events.last()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merge another event log into this one
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Drop every event after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl IntoIterator for EventLog {
    type Item = LedgerEvent;
    type IntoIter = std::vec::IntoIter<LedgerEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn deposited(amount: u128, block_height: u64) -> LedgerEvent {
        LedgerEvent::Deposited(DepositedEvent {
            user: Address::from_low_u64(1),
            asset: Asset::Native,
            amount,
            new_amount: amount,
            block_height,
            timestamp: 1_672_301_776,
            tx_hash: Hash::sha256(b"deposit"),
        })
    }

    #[test]
    fn test_event_types() {
        let event = deposited(100, 7);
        assert_eq!(event.event_type(), "Deposited");
        assert_eq!(event.timestamp(), 1_672_301_776);
        assert_eq!(event.block_height(), 7);
        assert_eq!(event.asset(), Some(Asset::Native));
        assert_eq!(event.tx_hash(), Hash::sha256(b"deposit"));
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.push(deposited(100, 1));
        log.push(LedgerEvent::FeeCollected(FeeCollectedEvent {
            asset: Asset::Native,
            amount: 3,
            receiver: Address::from_low_u64(2),
            block_height: 2,
            timestamp: 1_672_301_777,
            tx_hash: Hash::zero(),
        }));

        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type("Deposited").len(), 1);
        assert_eq!(log.filter_by_type("FeeCollected").len(), 1);
        assert_eq!(log.last().map(|e| e.event_type()), Some("FeeCollected"));

        log.truncate(1);
        assert_eq!(log.len(), 1);

        let mut other = EventLog::new();
        other.push(deposited(5, 3));
        log.merge(other);
        assert_eq!(log.into_iter().count(), 2);
    }

    #[test]
    fn test_event_hash() {
        let hash1 = deposited(100, 1).hash();
        let hash2 = deposited(100, 1).hash();
        assert_eq!(hash1, hash2);
        assert!(!hash1.is_zero());
        assert_ne!(hash1, deposited(101, 1).hash());
    }
}

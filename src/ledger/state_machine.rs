//! Ledger state machine - the core bookkeeping engine.
//!
//! The [`Ledger`] owns every balance record and is the only thing that
//! mutates them. Each mutating operation follows the same shape:
//!
//! 1. take the reentrancy lock
//! 2. validate the call
//! 3. compute the new per-user and aggregate records through the fee math
//! 4. commit them
//! 5. perform at most one external transfer through the [`AssetTransport`]
//! 6. on transfer failure restore everything touched since step 4
//!
//! A failing operation therefore leaves records, owner and events exactly as
//! they were.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::asset::Asset;
use crate::core::config::LedgerConfig;
use crate::core::record::BalanceRecord;
use crate::error::{Error, Result};
use crate::ledger::events::*;
use crate::ledger::guard::{GuardToken, ReentrancyGuard};
use crate::ledger::operations::*;
use crate::ledger::transport::{transfer_error, AssetTransport};
use crate::utils::crypto::{Address, Hash};

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER META
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything about a ledger except its balance records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMeta {
    /// Creation parameters
    pub config: LedgerConfig,
    /// Current owner
    pub owner: Address,
    /// Last block height seen
    pub block_height: u64,
    /// Last block timestamp seen
    pub timestamp: u64,
}

/// State touched by an operation, kept so a failed transfer can be undone
struct Checkpoint {
    asset: Asset,
    total: Option<BalanceRecord>,
    user: Option<(Address, Option<BalanceRecord>)>,
    owner: Address,
    events: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Custodial multi-asset ledger with a linear holding fee
#[derive(Debug)]
pub struct Ledger {
    /// Creation parameters
    config: LedgerConfig,
    /// Current owner, empowered to collect fees
    owner: Address,
    /// Per-user records, keyed by user then asset
    users: BTreeMap<Address, BTreeMap<Asset, BalanceRecord>>,
    /// Aggregate records over all users, keyed by asset
    totals: BTreeMap<Asset, BalanceRecord>,
    /// Current block height
    block_height: u64,
    /// Current block timestamp
    timestamp: u64,
    /// Ledger-wide reentrancy lock
    guard: ReentrancyGuard,
    /// Events since the last block boundary
    event_log: EventLog,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let owner = config.owner;
        Ok(Self {
            config,
            owner,
            users: BTreeMap::new(),
            totals: BTreeMap::new(),
            block_height: 0,
            timestamp: 0,
            guard: ReentrancyGuard::new(),
            event_log: EventLog::new(),
        })
    }

    /// Rebuild a ledger from saved parts
    pub fn from_parts(
        meta: LedgerMeta,
        users: impl IntoIterator<Item = (Address, Asset, BalanceRecord)>,
        totals: impl IntoIterator<Item = (Asset, BalanceRecord)>,
    ) -> Result<Self> {
        meta.config.validate()?;
        if meta.owner.is_zero() {
            return Err(Error::InvalidOwnerAddress);
        }

        let mut ledger = Self::new(meta.config)?;
        ledger.owner = meta.owner;
        ledger.block_height = meta.block_height;
        ledger.timestamp = meta.timestamp;
        for (user, asset, record) in users {
            ledger.users.entry(user).or_default().insert(asset, record);
        }
        ledger.totals.extend(totals);
        Ok(ledger)
    }

    /// Everything about the ledger except its balance records
    pub fn meta(&self) -> LedgerMeta {
        LedgerMeta {
            config: self.config.clone(),
            owner: self.owner,
            block_height: self.block_height,
            timestamp: self.timestamp,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BLOCK PROCESSING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Begin a new block; timestamps may not go backwards
    pub fn begin_block(&mut self, height: u64, timestamp: u64) -> Result<()> {
        if self.guard.is_locked() {
            return Err(Error::ReentrantCall);
        }
        if timestamp < self.timestamp {
            return Err(Error::TimestampRegression {
                current: self.timestamp,
                requested: timestamp,
            });
        }
        self.block_height = height;
        self.timestamp = timestamp;
        Ok(())
    }

    /// End the current block and hand over its events
    pub fn end_block(&mut self) -> Result<EventLog> {
        if self.guard.is_locked() {
            return Err(Error::ReentrantCall);
        }
        Ok(std::mem::take(&mut self.event_log))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute a ledger operation
    pub fn execute(
        &mut self,
        op: LedgerOperation,
        transport: &mut dyn AssetTransport,
    ) -> Result<OperationResult> {
        let tx_hash = op.hash()?;
        let op_type = op.operation_type();

        let result = match op {
            LedgerOperation::Deposit(op) => self
                .execute_deposit(op, tx_hash, transport)
                .map(OperationResult::Deposit),
            LedgerOperation::Withdraw(op) => self
                .execute_withdraw(op, tx_hash, transport)
                .map(OperationResult::Withdraw),
            LedgerOperation::CollectFees(op) => self
                .execute_collect_fees(op, tx_hash, transport)
                .map(OperationResult::CollectFees),
            LedgerOperation::TransferOwnership(op) => self
                .execute_transfer_ownership(op, tx_hash)
                .map(OperationResult::TransferOwnership),
        };

        if let Err(e) = &result {
            tracing::debug!("{} {} rejected: {}", op_type, tx_hash, e);
        }
        result
    }

    /// Deposit `amount` of `asset` for `caller`, with `value` native currency attached
    pub fn deposit(
        &mut self,
        caller: Address,
        asset: Asset,
        amount: u128,
        value: u128,
        transport: &mut dyn AssetTransport,
    ) -> Result<DepositResult> {
        let op = DepositOp {
            caller,
            asset,
            amount,
            value,
        };
        let tx_hash = LedgerOperation::Deposit(op.clone()).hash()?;
        self.execute_deposit(op, tx_hash, transport)
    }

    /// Withdraw `amount` of `asset` to `caller`
    pub fn withdraw(
        &mut self,
        caller: Address,
        asset: Asset,
        amount: u128,
        transport: &mut dyn AssetTransport,
    ) -> Result<WithdrawResult> {
        let op = WithdrawOp {
            caller,
            asset,
            amount,
        };
        let tx_hash = LedgerOperation::Withdraw(op.clone()).hash()?;
        self.execute_withdraw(op, tx_hash, transport)
    }

    /// Sweep every fee accrued in `asset` to `receiver`; owner only
    pub fn collect_fees(
        &mut self,
        caller: Address,
        asset: Asset,
        receiver: Address,
        transport: &mut dyn AssetTransport,
    ) -> Result<CollectFeesResult> {
        let op = CollectFeesOp {
            caller,
            asset,
            receiver,
        };
        let tx_hash = LedgerOperation::CollectFees(op.clone()).hash()?;
        self.execute_collect_fees(op, tx_hash, transport)
    }

    /// Hand ownership to `new_owner`; owner only
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<TransferOwnershipResult> {
        let op = TransferOwnershipOp { caller, new_owner };
        let tx_hash = LedgerOperation::TransferOwnership(op.clone()).hash()?;
        self.execute_transfer_ownership(op, tx_hash)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BALANCE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    fn execute_deposit(
        &mut self,
        op: DepositOp,
        tx_hash: Hash,
        transport: &mut dyn AssetTransport,
    ) -> Result<DepositResult> {
        let _lock = self.enter("Deposit")?;

        if op.amount == 0 {
            return Err(Error::InvalidDepositAmount);
        }
        let expected = if op.asset.is_native() { op.amount } else { 0 };
        if op.value != expected {
            return Err(Error::InvalidAmountSent {
                expected,
                sent: op.value,
            });
        }

        let (now, rate) = (self.timestamp, self.config.fee_per_second);
        let (user_record, accrual) = self
            .user_deposit(op.caller, op.asset)
            .deposit(op.amount, now, rate)?;
        let (total_record, _) = self.total_deposit(op.asset).deposit(op.amount, now, rate)?;

        let checkpoint = self.checkpoint(op.asset, Some(op.caller));
        self.commit(op.asset, total_record, Some((op.caller, user_record)));

        if let Err(e) = transport.receive(self, op.asset, op.caller, op.amount) {
            tracing::warn!("Deposit of {} {} from {} failed: {}", op.amount, op.asset, op.caller.short(), e);
            self.restore(checkpoint);
            return Err(transfer_error(op.asset, e));
        }

        self.event_log.push(LedgerEvent::Deposited(DepositedEvent {
            user: op.caller,
            asset: op.asset,
            amount: op.amount,
            new_amount: user_record.amount,
            block_height: self.block_height,
            timestamp: now,
            tx_hash,
        }));
        tracing::debug!(
            "Deposited {} {} for {} (fee {} over {}s)",
            op.amount,
            op.asset,
            op.caller.short(),
            accrual.fee,
            accrual.elapsed
        );

        Ok(DepositResult {
            record: user_record,
            accrual,
            tx_hash,
        })
    }

    fn execute_withdraw(
        &mut self,
        op: WithdrawOp,
        tx_hash: Hash,
        transport: &mut dyn AssetTransport,
    ) -> Result<WithdrawResult> {
        let _lock = self.enter("Withdraw")?;

        if op.amount == 0 {
            return Err(Error::InvalidWithdrawAmount);
        }

        let (now, rate) = (self.timestamp, self.config.fee_per_second);
        let current = self.user_deposit(op.caller, op.asset);
        let available = self.withdraw_ceiling(op.caller, op.asset)?;
        if op.amount > available {
            return Err(Error::InvalidWithdrawal {
                requested: op.amount,
                available,
            });
        }
        let (user_record, accrual) = current.withdraw(op.amount, now, rate)?;
        let (total_record, _) = self.total_deposit(op.asset).withdraw(op.amount, now, rate)?;

        let checkpoint = self.checkpoint(op.asset, Some(op.caller));
        self.commit(op.asset, total_record, Some((op.caller, user_record)));

        if let Err(e) = transport.send(self, op.asset, op.caller, op.amount) {
            tracing::warn!("Withdrawal of {} {} to {} failed: {}", op.amount, op.asset, op.caller.short(), e);
            self.restore(checkpoint);
            return Err(transfer_error(op.asset, e));
        }

        self.event_log.push(LedgerEvent::Withdrawal(WithdrawalEvent {
            user: op.caller,
            asset: op.asset,
            amount: op.amount,
            new_amount: user_record.amount,
            block_height: self.block_height,
            timestamp: now,
            tx_hash,
        }));
        tracing::debug!(
            "Withdrew {} {} for {} ({} left)",
            op.amount,
            op.asset,
            op.caller.short(),
            user_record.amount
        );

        Ok(WithdrawResult {
            withdrawn: op.amount,
            record: user_record,
            accrual,
            tx_hash,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OWNER OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    fn execute_collect_fees(
        &mut self,
        op: CollectFeesOp,
        tx_hash: Hash,
        transport: &mut dyn AssetTransport,
    ) -> Result<CollectFeesResult> {
        let _lock = self.enter("CollectFees")?;

        self.require_owner(op.caller)?;
        if op.receiver.is_zero() {
            return Err(Error::InvalidFeeCollectionAddress);
        }
        let current = self.total_deposit(op.asset);
        if current.amount == 0 {
            return Err(Error::NoDepositsForToken(op.asset.to_string()));
        }

        let collection = current.collect(self.timestamp, self.config.fee_per_second)?;

        let checkpoint = self.checkpoint(op.asset, None);
        self.commit(op.asset, collection.record, None);

        if let Err(e) = transport.send(self, op.asset, op.receiver, collection.collected) {
            tracing::warn!(
                "Fee collection of {} {} to {} failed: {}",
                collection.collected,
                op.asset,
                op.receiver.short(),
                e
            );
            self.restore(checkpoint);
            return Err(transfer_error(op.asset, e));
        }

        self.event_log.push(LedgerEvent::FeeCollected(FeeCollectedEvent {
            asset: op.asset,
            amount: collection.collected,
            receiver: op.receiver,
            block_height: self.block_height,
            timestamp: self.timestamp,
            tx_hash,
        }));
        tracing::info!(
            "Collected {} {} in fees to {}",
            collection.collected,
            op.asset,
            op.receiver.short()
        );

        Ok(CollectFeesResult {
            collected: collection.collected,
            record: collection.record,
            tx_hash,
        })
    }

    fn execute_transfer_ownership(
        &mut self,
        op: TransferOwnershipOp,
        tx_hash: Hash,
    ) -> Result<TransferOwnershipResult> {
        self.require_owner(op.caller)?;
        if op.new_owner.is_zero() {
            return Err(Error::InvalidOwnerAddress);
        }

        let previous = std::mem::replace(&mut self.owner, op.new_owner);
        self.event_log
            .push(LedgerEvent::OwnershipTransferred(OwnershipTransferredEvent {
                previous,
                new_owner: op.new_owner,
                block_height: self.block_height,
                timestamp: self.timestamp,
                tx_hash,
            }));
        tracing::info!("Ownership transferred from {} to {}", previous.short(), op.new_owner.short());

        Ok(TransferOwnershipResult {
            previous,
            new_owner: op.new_owner,
            tx_hash,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn enter(&self, operation: &str) -> Result<GuardToken> {
        self.guard.enter().map_err(|e| {
            tracing::warn!("Rejected reentrant {}", operation);
            e
        })
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(Error::NotOwner(caller.to_hex()));
        }
        Ok(())
    }

    fn checkpoint(&self, asset: Asset, user: Option<Address>) -> Checkpoint {
        Checkpoint {
            asset,
            total: self.totals.get(&asset).copied(),
            user: user.map(|u| {
                let record = self.users.get(&u).and_then(|m| m.get(&asset)).copied();
                (u, record)
            }),
            owner: self.owner,
            events: self.event_log.len(),
        }
    }

    fn commit(&mut self, asset: Asset, total: BalanceRecord, user: Option<(Address, BalanceRecord)>) {
        self.totals.insert(asset, total);
        if let Some((user, record)) = user {
            self.users.entry(user).or_default().insert(asset, record);
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        let asset = checkpoint.asset;
        match checkpoint.total {
            Some(record) => {
                self.totals.insert(asset, record);
            }
            None => {
                self.totals.remove(&asset);
            }
        }
        if let Some((user, previous)) = checkpoint.user {
            match previous {
                Some(record) => {
                    self.users.entry(user).or_default().insert(asset, record);
                }
                None => {
                    if let Some(records) = self.users.get_mut(&user) {
                        records.remove(&asset);
                        if records.is_empty() {
                            self.users.remove(&user);
                        }
                    }
                }
            }
        }
        self.owner = checkpoint.owner;
        self.event_log.truncate(checkpoint.events);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PREVIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Largest amount `user` could withdraw of `asset` right now
    pub fn preview_withdrawable(&self, user: Address, asset: Asset) -> Result<u128> {
        self.withdraw_ceiling(user, asset)
    }

    /// The user's fee-adjusted balance, capped by what the aggregate record
    /// can still cover. The aggregate fee floors once over the sum of
    /// principals, so it can run a few base units ahead of the user fees.
    fn withdraw_ceiling(&self, user: Address, asset: Asset) -> Result<u128> {
        let (now, rate) = (self.timestamp, self.config.fee_per_second);
        let user_available = self.user_deposit(user, asset).withdrawable(now, rate)?;
        let total_available = self.total_deposit(asset).withdrawable(now, rate)?;
        Ok(user_available.min(total_available))
    }

    /// Amount a fee collection for `asset` would sweep right now
    pub fn preview_collectible(&self, asset: Asset) -> Result<u128> {
        let total = self.total_deposit(asset);
        if total.amount == 0 {
            return Ok(0);
        }
        total
            .collect(self.timestamp, self.config.fee_per_second)
            .map(|c| c.collected)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record of `user` in `asset`; empty if never touched
    pub fn user_deposit(&self, user: Address, asset: Asset) -> BalanceRecord {
        self.users
            .get(&user)
            .and_then(|records| records.get(&asset))
            .copied()
            .unwrap_or(BalanceRecord::EMPTY)
    }

    /// Aggregate record of `asset`; empty if never touched
    pub fn total_deposit(&self, asset: Asset) -> BalanceRecord {
        self.totals.get(&asset).copied().unwrap_or(BalanceRecord::EMPTY)
    }

    /// Assets `user` has ever deposited
    pub fn user_assets(&self, user: Address) -> Vec<Asset> {
        self.users
            .get(&user)
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Assets ever deposited by anyone
    pub fn assets(&self) -> Vec<Asset> {
        self.totals.keys().copied().collect()
    }

    /// Every user that has ever deposited
    pub fn users(&self) -> Vec<Address> {
        self.users.keys().copied().collect()
    }

    /// All per-user records
    pub fn user_records(&self) -> impl Iterator<Item = (Address, Asset, BalanceRecord)> + '_ {
        self.users.iter().flat_map(|(user, records)| {
            records
                .iter()
                .map(move |(asset, record)| (*user, *asset, *record))
        })
    }

    /// All aggregate records
    pub fn total_records(&self) -> impl Iterator<Item = (Asset, BalanceRecord)> + '_ {
        self.totals.iter().map(|(asset, record)| (*asset, *record))
    }

    /// Fee per second per unit of principal, scaled by 10^18
    pub fn fee_per_second(&self) -> u128 {
        self.config.fee_per_second
    }

    /// Address that stands for the native currency
    pub fn native_asset_address(&self) -> Address {
        Asset::NATIVE_ADDRESS
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Address custody is held under
    pub fn custody(&self) -> Address {
        self.config.custody
    }

    /// Ledger configuration
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current block height
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Current block timestamp
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Events since the last block boundary
    pub fn pending_events(&self) -> &EventLog {
        &self.event_log
    }

    /// Whether a guarded operation is in progress
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

//! In-memory asset transport.
//!
//! [`InMemoryBank`] keeps native and token balances for every holder, the
//! allowances that gate token pulls, and two knobs for simulating hostile
//! counterparties: holders that refuse native currency, and per-holder hooks
//! that run whenever the holder receives something from custody.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::core::asset::Asset;
use crate::error::{Error, Result};
use crate::ledger::state_machine::Ledger;
use crate::ledger::transport::AssetTransport;
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, safe_sub};

/// Callback run after a holder has been credited from custody.
///
/// Returning an error makes the transfer fail and undoes the credit.
pub type ReceiptHook = Box<dyn FnMut(&mut Ledger, Asset, u128) -> Result<()> + Send>;

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable balance sheet of the bank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Native currency per holder
    pub native: BTreeMap<Address, u128>,
    /// Token contract -> holder -> balance
    pub tokens: BTreeMap<Address, BTreeMap<Address, u128>>,
    /// Token contract -> owner -> spender -> allowance
    pub allowances: BTreeMap<Address, BTreeMap<Address, BTreeMap<Address, u128>>>,
}

impl Balances {
    /// Balance of `holder` in `asset`
    pub fn balance_of(&self, asset: Asset, holder: Address) -> u128 {
        match asset {
            Asset::Native => self.native.get(&holder).copied().unwrap_or(0),
            Asset::Token(token) => self
                .tokens
                .get(&token)
                .and_then(|holders| holders.get(&holder))
                .copied()
                .unwrap_or(0),
        }
    }

    /// Amount `spender` may still pull from `owner`
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.allowances
            .get(&token)
            .and_then(|owners| owners.get(&owner))
            .and_then(|spenders| spenders.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every holder's balance in `asset`
    pub fn supply(&self, asset: Asset) -> u128 {
        match asset {
            Asset::Native => self.native.values().sum(),
            Asset::Token(token) => self
                .tokens
                .get(&token)
                .map(|holders| holders.values().sum())
                .unwrap_or(0),
        }
    }

    fn slot(&mut self, asset: Asset, holder: Address) -> &mut u128 {
        match asset {
            Asset::Native => self.native.entry(holder).or_insert(0),
            Asset::Token(token) => self
                .tokens
                .entry(token)
                .or_default()
                .entry(holder)
                .or_insert(0),
        }
    }

    fn credit(&mut self, asset: Asset, holder: Address, amount: u128) -> Result<()> {
        let slot = self.slot(asset, holder);
        *slot = safe_add(*slot, amount)?;
        Ok(())
    }

    fn debit(&mut self, asset: Asset, holder: Address, amount: u128) -> Result<()> {
        if self.balance_of(asset, holder) < amount {
            return Err(insufficient_balance(asset));
        }
        let slot = self.slot(asset, holder);
        *slot = safe_sub(*slot, amount)?;
        Ok(())
    }

    /// Move `amount` between two holders, all or nothing
    fn transfer(&mut self, asset: Asset, from: Address, to: Address, amount: u128) -> Result<()> {
        if self.balance_of(asset, from) < amount {
            return Err(insufficient_balance(asset));
        }
        if from != to {
            safe_add(self.balance_of(asset, to), amount)?;
        }
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }
}

fn insufficient_balance(asset: Asset) -> Error {
    match asset {
        Asset::Native => Error::NativeTransferFailed,
        Asset::Token(_) => Error::TokenTransferFailed {
            reason: "transfer amount exceeds balance".into(),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BANK
// ═══════════════════════════════════════════════════════════════════════════════

/// Transport that settles transfers against an in-memory balance sheet
pub struct InMemoryBank {
    custody: Address,
    balances: Balances,
    rejects_native: BTreeSet<Address>,
    hooks: HashMap<Address, ReceiptHook>,
}

impl InMemoryBank {
    /// Create an empty bank holding custody under `custody`
    pub fn new(custody: Address) -> Self {
        Self::with_balances(custody, Balances::default())
    }

    /// Create a bank from a previously saved balance sheet
    pub fn with_balances(custody: Address, balances: Balances) -> Self {
        Self {
            custody,
            balances,
            rejects_native: BTreeSet::new(),
            hooks: HashMap::new(),
        }
    }

    /// Address custody is held under
    pub fn custody(&self) -> Address {
        self.custody
    }

    /// Current balance sheet
    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Balance of `holder` in `asset`
    pub fn balance_of(&self, asset: Asset, holder: Address) -> u128 {
        self.balances.balance_of(asset, holder)
    }

    /// Amount of `asset` held in custody
    pub fn custody_balance(&self, asset: Asset) -> u128 {
        self.balances.balance_of(asset, self.custody)
    }

    /// Create `amount` of `asset` out of thin air for `holder`
    pub fn mint(&mut self, asset: Asset, holder: Address, amount: u128) -> Result<()> {
        self.balances.credit(asset, holder, amount)
    }

    /// Let `spender` pull up to `amount` of `token` from `owner`
    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: u128) {
        self.balances
            .allowances
            .entry(token)
            .or_default()
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    /// Amount `spender` may still pull from `owner`
    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> u128 {
        self.balances.allowance(token, owner, spender)
    }

    /// Make `holder` refuse (or accept again) incoming native currency
    pub fn set_rejects_native(&mut self, holder: Address, rejects: bool) {
        if rejects {
            self.rejects_native.insert(holder);
        } else {
            self.rejects_native.remove(&holder);
        }
    }

    /// Run `hook` whenever `holder` is paid out of custody
    pub fn set_hook(&mut self, holder: Address, hook: ReceiptHook) {
        self.hooks.insert(holder, hook);
    }

    /// Remove the hook registered for `holder`
    pub fn clear_hook(&mut self, holder: Address) {
        self.hooks.remove(&holder);
    }
}

impl fmt::Debug for InMemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBank")
            .field("custody", &self.custody)
            .field("balances", &self.balances)
            .field("rejects_native", &self.rejects_native)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl AssetTransport for InMemoryBank {
    fn receive(&mut self, _ledger: &mut Ledger, asset: Asset, from: Address, amount: u128) -> Result<()> {
        if let Asset::Token(token) = asset {
            let allowed = self.balances.allowance(token, from, self.custody);
            if allowed < amount {
                return Err(Error::TokenTransferFailed {
                    reason: format!("insufficient allowance: {} < {}", allowed, amount),
                });
            }
            self.balances.transfer(asset, from, self.custody, amount)?;
            self.approve(token, from, self.custody, safe_sub(allowed, amount)?);
            return Ok(());
        }
        self.balances.transfer(asset, from, self.custody, amount)
    }

    fn send(&mut self, ledger: &mut Ledger, asset: Asset, to: Address, amount: u128) -> Result<()> {
        if asset.is_native() && self.rejects_native.contains(&to) {
            return Err(Error::NativeTransferFailed);
        }
        self.balances.transfer(asset, self.custody, to, amount)?;

        if let Some(hook) = self.hooks.get_mut(&to) {
            if let Err(err) = hook(ledger, asset, amount) {
                self.balances.transfer(asset, to, self.custody, amount)?;
                return Err(err);
            }
        }
        Ok(())
    }
}

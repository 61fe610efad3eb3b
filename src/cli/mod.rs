//! Digital Safe Command Line Interface.
//!
//! Operator tooling around a ledger persisted in a local data directory,
//! with a local bank standing in for the asset contracts.

pub mod amount;
pub mod config;
pub mod keys;
pub mod output;

pub use amount::*;
pub use config::*;
pub use keys::*;
pub use output::*;

use crate::core::config::LedgerConfig;
use crate::ledger::bank::InMemoryBank;
use crate::ledger::events::EventLog;
use crate::ledger::state_machine::Ledger;
use crate::storage::backend::FileStore;
use crate::storage::state::LedgerStore;
use crate::utils::crypto::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// A ledger and its bank opened from the data directory.
///
/// Each command runs as one block: [`Session::begin_block`], any number of
/// ledger calls, then [`Session::commit`] to persist the outcome.
pub struct Session {
    /// Configuration
    config: CliConfig,
    /// Persistent store
    store: LedgerStore<FileStore>,
    /// The ledger
    ledger: Ledger,
    /// Local asset balances
    bank: InMemoryBank,
}

impl Session {
    /// Create a fresh ledger owned by `owner` and save it
    pub fn init(config: CliConfig, owner: Address) -> CliResult<Self> {
        config.validate()?;
        let store = open_store(&config)?;
        if store.is_initialized()? {
            return Err(CliError::InvalidArgument(format!(
                "a ledger already exists in {}",
                config.data_dir.display()
            )));
        }

        let ledger_config = LedgerConfig::new(owner).with_fee_per_second(config.fee_per_second);
        let ledger = Ledger::new(ledger_config)?;
        let bank = InMemoryBank::new(ledger.custody());

        store.save_ledger(&ledger)?;
        store.save_bank(bank.balances())?;
        config.save(&config.path())?;

        tracing::info!(
            owner = %owner,
            fee_per_second = config.fee_per_second,
            "Initialized ledger"
        );

        Ok(Self {
            config,
            store,
            ledger,
            bank,
        })
    }

    /// Open the ledger saved in the data directory
    pub fn open(config: CliConfig) -> CliResult<Self> {
        let store = open_store(&config)?;
        let ledger = store.load_ledger()?.ok_or_else(|| {
            CliError::NotFound(format!(
                "no ledger in {}; run `digital-safe init` first",
                config.data_dir.display()
            ))
        })?;
        let bank = InMemoryBank::with_balances(ledger.custody(), store.load_bank()?);

        tracing::debug!(
            height = ledger.block_height(),
            timestamp = ledger.timestamp(),
            "Opened ledger"
        );

        Ok(Self {
            config,
            store,
            ledger,
            bank,
        })
    }

    /// Start the next block at `timestamp`, or at the current time if none is given
    pub fn begin_block(&mut self, timestamp: Option<u64>) -> CliResult<()> {
        let timestamp = match timestamp {
            Some(timestamp) => timestamp,
            None => {
                let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
                now.max(self.ledger.timestamp())
            }
        };
        let height = self.ledger.block_height() + 1;
        self.ledger.begin_block(height, timestamp)?;
        Ok(())
    }

    /// Close the block and persist the ledger, the bank and the block's events
    pub fn commit(mut self) -> CliResult<EventLog> {
        let events = self.ledger.end_block()?;
        self.store.save_ledger(&self.ledger)?;
        self.store.save_bank(self.bank.balances())?;
        self.store.append_events(&events)?;
        Ok(events)
    }

    /// Get configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Get the store
    pub fn store(&self) -> &LedgerStore<FileStore> {
        &self.store
    }

    /// Get the ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Get the bank
    pub fn bank(&self) -> &InMemoryBank {
        &self.bank
    }

    /// Get the bank for minting and approvals
    pub fn bank_mut(&mut self) -> &mut InMemoryBank {
        &mut self.bank
    }

    /// Ledger and bank together, for operations that move assets
    pub fn parts_mut(&mut self) -> (&mut Ledger, &mut InMemoryBank) {
        (&mut self.ledger, &mut self.bank)
    }
}

fn open_store(config: &CliConfig) -> CliResult<LedgerStore<FileStore>> {
    let backend = FileStore::new(config.ledger_dir())?;
    Ok(LedgerStore::new(backend))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLI RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Error types
#[derive(Debug, Clone)]
pub enum CliError {
    /// Configuration error
    Config(String),
    /// Ledger rejected the operation
    Ledger(crate::error::Error),
    /// Invalid argument
    InvalidArgument(String),
    /// IO error
    Io(String),
    /// Not found
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Ledger(err) => write!(f, "Ledger error {}: {}", err.code(), err),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Io(msg) => write!(f, "IO error: {}", msg),
            CliError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<crate::error::Error> for CliError {
    fn from(err: crate::error::Error) -> Self {
        CliError::Ledger(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

/// CLI Result type
pub type CliResult<T> = std::result::Result<T, CliError>;

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::Asset;
    use crate::error::Error;
    use crate::utils::constants::FEE_SCALE;

    #[test]
    fn test_session_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = CliConfig::new(temp_dir.path());
        let owner = Address::from_low_u64(1);
        let alice = Address::from_low_u64(2);

        let mut session = Session::init(config.clone(), owner).unwrap();
        session.begin_block(Some(1_000)).unwrap();
        session.bank_mut().mint(Asset::Native, alice, FEE_SCALE).unwrap();
        {
            let (ledger, bank) = session.parts_mut();
            ledger.deposit(alice, Asset::Native, FEE_SCALE, FEE_SCALE, bank).unwrap();
        }
        let events = session.commit().unwrap();
        assert_eq!(events.len(), 1);

        let mut session = Session::open(config).unwrap();
        assert_eq!(session.ledger().owner(), owner);
        assert_eq!(session.ledger().block_height(), 1);
        assert_eq!(session.ledger().user_deposit(alice, Asset::Native).amount, FEE_SCALE);
        assert_eq!(session.bank().custody_balance(Asset::Native), FEE_SCALE);
        assert_eq!(session.store().recent_events(10).unwrap().len(), 1);

        session.begin_block(None).unwrap();
        assert_eq!(session.ledger().block_height(), 2);
        assert!(session.ledger().timestamp() >= 1_000);
    }

    #[test]
    fn test_session_init_twice_and_open_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = CliConfig::new(temp_dir.path());

        assert!(matches!(
            Session::open(config.clone()),
            Err(CliError::NotFound(_))
        ));

        Session::init(config.clone(), Address::from_low_u64(1)).unwrap();
        assert!(matches!(
            Session::init(config, Address::from_low_u64(1)),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_session_rejects_earlier_timestamp() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut session =
            Session::init(CliConfig::new(temp_dir.path()), Address::from_low_u64(1)).unwrap();
        session.begin_block(Some(500)).unwrap();
        assert!(matches!(
            session.begin_block(Some(400)),
            Err(CliError::Ledger(Error::TimestampRegression { .. }))
        ));
    }

    #[test]
    fn test_cli_error_display() {
        let err = CliError::Config("bad config".into());
        assert!(err.to_string().contains("Configuration error"));

        let err = CliError::from(Error::InvalidDepositAmount);
        assert_eq!(err.to_string(), "Ledger error 1001: Invalid deposit amount");
    }
}

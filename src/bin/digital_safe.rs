//! Digital Safe CLI
//!
//! Command-line tool for operating a local Digital Safe ledger.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::{style, Term};
use dialoguer::Confirm;
use std::path::PathBuf;

use digital_safe::cli::{
    format_amount, parse_amount, CliConfig, KeyStore, OutputFormat, OutputFormatter, Session,
};
use digital_safe::core::asset::Asset;
use digital_safe::ledger::events::LedgerEvent;
use digital_safe::utils::crypto::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// CLI DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Parser)]
#[command(name = "digital-safe")]
#[command(author = "Digital Safe Team")]
#[command(version = "0.1.0")]
#[command(about = "Multi-asset custodial ledger with a linear holding fee", long_about = None)]
struct Cli {
    /// Data directory for keys and the ledger
    #[arg(short, long, env = "SAFE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format: text, json, json-pretty, minimal
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Decimals used to parse and print amounts
    #[arg(long)]
    decimals: Option<u8>,

    /// Unix timestamp of the block the command runs in (defaults to now)
    #[arg(long)]
    timestamp: Option<u64>,

    /// Identity to act as
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the operator identity and an empty ledger it owns
    Init {
        /// Holding fee per second, scaled by 10^18
        #[arg(long)]
        fee_per_second: Option<u128>,
    },

    /// Manage local identities
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Credit an identity in the local bank
    Mint {
        /// Asset: `native` or a token address
        asset: Asset,
        /// Amount, in whole units
        amount: String,
        /// Recipient identity or address
        #[arg(long)]
        to: String,
    },

    /// Let the safe pull a token from the acting identity
    Approve {
        /// Token address
        token: Address,
        /// Allowance, in whole units
        amount: String,
    },

    /// Deposit into the safe
    Deposit {
        /// Asset: `native` or a token address
        asset: Asset,
        /// Amount, in whole units
        amount: String,
        /// Native value to attach; defaults to the amount for native deposits
        #[arg(long)]
        value: Option<String>,
    },

    /// Withdraw from the safe
    Withdraw {
        /// Asset: `native` or a token address
        asset: Asset,
        /// Amount, in whole units; `max` takes everything withdrawable
        amount: String,
    },

    /// Sweep accrued fees to a receiver (owner only)
    CollectFees {
        /// Asset: `native` or a token address
        asset: Asset,
        /// Receiver identity or address
        #[arg(long)]
        to: String,
    },

    /// Hand ownership to another identity (owner only)
    TransferOwnership {
        /// New owner identity or address
        new_owner: String,
    },

    /// Show an identity's deposits
    Balance {
        /// Identity or address; defaults to the acting identity
        #[arg(long)]
        of: Option<String>,
    },

    /// Show aggregate deposits and collectible fees
    Total,

    /// Show ledger status
    Status,

    /// Show recent events
    History {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// Generate a new identity
    New {
        /// Identity name
        name: String,
    },
    /// List identities
    List,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let mut config = CliConfig::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    let mut config = config.load_or()?;
    if let Some(decimals) = cli.decimals {
        config.display_decimals = decimals;
    }
    config.validate()?;

    let ctx = App {
        keys: KeyStore::new(config.keys_dir()),
        out: OutputFormatter::new(cli.format),
        identity: cli
            .identity
            .clone()
            .unwrap_or_else(|| config.default_identity.clone()),
        decimals: config.display_decimals,
        confirm: config.confirm && !cli.yes,
        timestamp: cli.timestamp,
        config,
    };

    match &cli.command {
        Commands::Init { fee_per_second } => cmd_init(&ctx, *fee_per_second, term),
        Commands::Keys { action } => cmd_keys(&ctx, action),
        Commands::Mint { asset, amount, to } => cmd_mint(&ctx, *asset, amount, to),
        Commands::Approve { token, amount } => cmd_approve(&ctx, *token, amount),
        Commands::Deposit {
            asset,
            amount,
            value,
        } => cmd_deposit(&ctx, *asset, amount, value.as_deref()),
        Commands::Withdraw { asset, amount } => cmd_withdraw(&ctx, *asset, amount),
        Commands::CollectFees { asset, to } => cmd_collect_fees(&ctx, *asset, to),
        Commands::TransferOwnership { new_owner } => cmd_transfer_ownership(&ctx, new_owner),
        Commands::Balance { of } => cmd_balance(&ctx, of.as_deref()),
        Commands::Total => cmd_total(&ctx),
        Commands::Status => cmd_status(&ctx),
        Commands::History { limit } => cmd_history(&ctx, *limit),
    }
}

/// Resolved settings shared by every command
struct App {
    config: CliConfig,
    keys: KeyStore,
    out: OutputFormatter,
    identity: String,
    decimals: u8,
    confirm: bool,
    timestamp: Option<u64>,
}

impl App {
    fn caller(&self) -> anyhow::Result<Address> {
        Ok(self.keys.load(&self.identity)?.address())
    }

    fn amount(&self, text: &str) -> anyhow::Result<u128> {
        Ok(parse_amount(text, self.decimals)?)
    }

    fn show(&self, amount: u128) -> String {
        format_amount(amount, self.decimals)
    }

    fn open(&self) -> anyhow::Result<Session> {
        let mut session = Session::open(self.config.clone())?;
        session.begin_block(self.timestamp)?;
        Ok(session)
    }

    fn confirmed(&self, prompt: &str) -> anyhow::Result<bool> {
        if !self.confirm {
            return Ok(true);
        }
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(ctx: &App, fee_per_second: Option<u128>, term: &Term) -> anyhow::Result<()> {
    term.write_line(&format!(
        "{}",
        style("Initializing Digital Safe").bold().cyan()
    ))?;

    let operator = match ctx.keys.load(&ctx.identity) {
        Ok(keypair) => keypair,
        Err(_) => ctx.keys.create(&ctx.identity)?,
    };

    let mut config = ctx.config.clone();
    if let Some(rate) = fee_per_second {
        config.fee_per_second = rate;
    }
    let session = Session::init(config, operator.address())?;
    let ledger = session.ledger();

    ctx.out.success(&format!("Ledger created in {}", ctx.config.data_dir.display()));
    ctx.out.kv("Owner", &format!("{} ({})", operator.address(), ctx.identity));
    ctx.out.kv("Custody", &ledger.custody().to_string());
    ctx.out.kv(
        "Fee",
        &format!(
            "{} per second ({:.4} bps/day)",
            ledger.fee_per_second(),
            ledger.config().daily_rate_bps()
        ),
    );
    Ok(())
}

fn cmd_keys(ctx: &App, action: &KeysAction) -> anyhow::Result<()> {
    match action {
        KeysAction::New { name } => {
            let keypair = ctx.keys.create(name)?;
            ctx.out.success(&format!("Created identity {}", name));
            ctx.out.kv("Address", &keypair.address().to_string());
            ctx.out.kv("Public key", &keypair.public_hex());
        }
        KeysAction::List => {
            let rows: Vec<Vec<String>> = ctx
                .keys
                .list()?
                .into_iter()
                .map(|(name, address)| vec![name, address.to_string()])
                .collect();
            ctx.out.table(&["name", "address"], &rows);
        }
    }
    Ok(())
}

fn cmd_mint(ctx: &App, asset: Asset, amount: &str, to: &str) -> anyhow::Result<()> {
    let amount = ctx.amount(amount)?;
    let holder = ctx.keys.resolve(to)?;

    let mut session = ctx.open()?;
    session.bank_mut().mint(asset, holder, amount)?;
    session.commit()?;

    ctx.out.success(&format!("Minted {} of {} to {}", ctx.show(amount), asset, holder));
    Ok(())
}

fn cmd_approve(ctx: &App, token: Address, amount: &str) -> anyhow::Result<()> {
    let amount = ctx.amount(amount)?;
    let owner = ctx.caller()?;

    let mut session = ctx.open()?;
    let custody = session.ledger().custody();
    session.bank_mut().approve(token, owner, custody, amount);
    session.commit()?;

    ctx.out.success(&format!(
        "Safe may pull {} of {} from {}",
        ctx.show(amount),
        token,
        ctx.identity
    ));
    Ok(())
}

fn cmd_deposit(ctx: &App, asset: Asset, amount: &str, value: Option<&str>) -> anyhow::Result<()> {
    let amount = ctx.amount(amount)?;
    let value = match value {
        Some(value) => ctx.amount(value)?,
        None if asset.is_native() => amount,
        None => 0,
    };
    let caller = ctx.caller()?;

    let mut session = ctx.open()?;
    let result = {
        let (ledger, bank) = session.parts_mut();
        ledger.deposit(caller, asset, amount, value, bank)?
    };
    session.commit()?;

    ctx.out.success(&format!("Deposited {} of {}", ctx.show(amount), asset));
    ctx.out.kv("Balance", &ctx.show(result.record.amount));
    ctx.out.kv("Fee charged", &ctx.show(result.accrual.fee));
    ctx.out.kv("Tx", &result.tx_hash.to_hex());
    Ok(())
}

fn cmd_withdraw(ctx: &App, asset: Asset, amount: &str) -> anyhow::Result<()> {
    let caller = ctx.caller()?;
    let mut session = ctx.open()?;

    let amount = if amount.eq_ignore_ascii_case("max") {
        session.ledger().preview_withdrawable(caller, asset)?
    } else {
        ctx.amount(amount)?
    };

    let result = {
        let (ledger, bank) = session.parts_mut();
        ledger.withdraw(caller, asset, amount, bank)?
    };
    session.commit()?;

    ctx.out.success(&format!("Withdrew {} of {}", ctx.show(result.withdrawn), asset));
    ctx.out.kv("Remaining", &ctx.show(result.record.amount));
    ctx.out.kv("Fee charged", &ctx.show(result.accrual.fee));
    ctx.out.kv("Tx", &result.tx_hash.to_hex());
    Ok(())
}

fn cmd_collect_fees(ctx: &App, asset: Asset, to: &str) -> anyhow::Result<()> {
    let caller = ctx.caller()?;
    let receiver = ctx.keys.resolve(to)?;
    let mut session = ctx.open()?;

    let collectible = session.ledger().preview_collectible(asset)?;
    let prompt = format!(
        "Send {} of {} in fees to {}?",
        ctx.show(collectible),
        asset,
        receiver
    );
    if !ctx.confirmed(&prompt)? {
        ctx.out.warning("Cancelled");
        return Ok(());
    }

    let result = {
        let (ledger, bank) = session.parts_mut();
        ledger.collect_fees(caller, asset, receiver, bank)?
    };
    session.commit()?;

    ctx.out.success(&format!(
        "Collected {} of {} to {}",
        ctx.show(result.collected),
        asset,
        receiver
    ));
    ctx.out.kv("Tx", &result.tx_hash.to_hex());
    Ok(())
}

fn cmd_transfer_ownership(ctx: &App, new_owner: &str) -> anyhow::Result<()> {
    let caller = ctx.caller()?;
    let new_owner = ctx
        .keys
        .resolve(new_owner)
        .with_context(|| format!("resolving new owner {}", new_owner))?;
    let mut session = ctx.open()?;

    if session.ledger().owner() != caller {
        bail!("{} is not the owner of this ledger", ctx.identity);
    }
    if !ctx.confirmed(&format!("Hand ownership to {}? This cannot be undone", new_owner))? {
        ctx.out.warning("Cancelled");
        return Ok(());
    }

    let result = session.parts_mut().0.transfer_ownership(caller, new_owner)?;
    session.commit()?;

    ctx.out.success(&format!(
        "Ownership moved from {} to {}",
        result.previous, result.new_owner
    ));
    Ok(())
}

fn cmd_balance(ctx: &App, of: Option<&str>) -> anyhow::Result<()> {
    let user = match of {
        Some(who) => ctx.keys.resolve(who)?,
        None => ctx.caller()?,
    };
    let session = ctx.open()?;
    let ledger = session.ledger();

    let mut rows = Vec::new();
    for asset in ledger.user_assets(user) {
        let record = ledger.user_deposit(user, asset);
        rows.push(vec![
            asset.to_string(),
            ctx.show(record.amount),
            ctx.show(ledger.preview_withdrawable(user, asset)?),
            ctx.show(session.bank().balance_of(asset, user)),
        ]);
    }

    ctx.out.section(&format!("Deposits of {}", user));
    ctx.out.table(&["asset", "recorded", "withdrawable", "wallet"], &rows);
    Ok(())
}

fn cmd_total(ctx: &App) -> anyhow::Result<()> {
    let session = ctx.open()?;
    let ledger = session.ledger();

    let mut rows = Vec::new();
    for asset in ledger.assets() {
        let record = ledger.total_deposit(asset);
        rows.push(vec![
            asset.to_string(),
            ctx.show(record.amount),
            ctx.show(ledger.preview_collectible(asset)?),
            ctx.show(session.bank().custody_balance(asset)),
        ]);
    }

    ctx.out.section("Aggregate deposits");
    ctx.out.table(&["asset", "principal", "collectible", "held"], &rows);
    Ok(())
}

fn cmd_status(ctx: &App) -> anyhow::Result<()> {
    let session = Session::open(ctx.config.clone())?;
    let ledger = session.ledger();

    ctx.out.section("Digital Safe Status");
    ctx.out.data(&serde_json::json!({
        "owner": ledger.owner(),
        "custody": ledger.custody(),
        "native_asset": ledger.native_asset_address(),
        "fee_per_second": ledger.fee_per_second().to_string(),
        "daily_rate_bps": ledger.config().daily_rate_bps(),
        "block_height": ledger.block_height(),
        "last_block": format_timestamp(ledger.timestamp()),
        "assets": ledger.assets().len(),
        "users": ledger.users().len(),
        "state_root": session.store().compute_state_root()?.to_hex(),
    }));
    Ok(())
}

fn cmd_history(ctx: &App, limit: usize) -> anyhow::Result<()> {
    let session = Session::open(ctx.config.clone())?;
    let events = session.store().recent_events(limit)?;

    if ctx.out.format() != OutputFormat::Text {
        ctx.out.data(&events);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = events.iter().map(|event| event_row(ctx, event)).collect();
    ctx.out.section("Recent events");
    ctx.out.table(&["height", "time", "event", "asset", "amount", "party"], &rows);
    Ok(())
}

fn event_row(ctx: &App, event: &LedgerEvent) -> Vec<String> {
    let asset = event.asset().map(|a| a.to_string()).unwrap_or_default();
    let (amount, party) = match event {
        LedgerEvent::Deposited(e) => (ctx.show(e.amount), e.user.short()),
        LedgerEvent::Withdrawal(e) => (ctx.show(e.amount), e.user.short()),
        LedgerEvent::FeeCollected(e) => (ctx.show(e.amount), e.receiver.short()),
        LedgerEvent::OwnershipTransferred(e) => (String::new(), e.new_owner.short()),
    };
    vec![
        event.block_height().to_string(),
        format_timestamp(event.timestamp()),
        event.event_type().to_string(),
        asset,
        amount,
        party,
    ]
}

fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

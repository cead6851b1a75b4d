//! # stakeledger CLI Module
//!
//! This module implements the CLI interface for stakeledger.
//!
//! ## Available Commands
//!
//! - `init` - Create a database and deploy the test-asset fixtures
//! - `server` - Start the HTTP server
//! - `status` - Show owner, custody, gate state and totals
//! - `pause` / `unpause` - Move the withdrawal gate (owner)
//! - `stake` / `unstake` - Deposit into or withdraw from custody
//! - `balance` - Show one holder's positions
//! - `mint` / `mint-batch` - Mint test supply (owner)
//! - `approve` / `approve-all` - Let custody pull a holder's assets
//! - `audit` - Compare recorded stakes with custody balances
//! - `export` - Write a framed snapshot to a file
//!
//! ## Trust Model
//!
//! The CLI opens the stake database directly, so whoever can run it already
//! controls every stored byte. It acts as whichever account `--holder` or
//! `--caller` names, and `--caller` defaults to the configured owner. The
//! HTTP API is the surface that separates accounts: it binds each request to
//! the account of its API key.

mod commands;

use crate::config::{AppConfig, ConfigOverrides};
use clap::{Parser, Subcommand};
use stakeledger_core::{Amount, Holder, LedgerError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// stakeledger - custody ledger for fungible and multi-identifier stakes
///
/// Deposits are always open. Withdrawals return a holder's whole position
/// and are gated by an owner-controlled pause switch.
#[derive(Parser, Debug)]
#[command(name = "stakeledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the stake database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Ledger owner account (0x-prefixed hex)
    #[arg(long, global = true)]
    pub owner: Option<Holder>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a database and deploy the test-asset fixtures
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show ledger status
    Status,

    /// Close the withdrawal gate
    Pause {
        /// Calling account (defaults to the configured owner)
        #[arg(long)]
        caller: Option<Holder>,
    },

    /// Open the withdrawal gate
    Unpause {
        /// Calling account (defaults to the configured owner)
        #[arg(long)]
        caller: Option<Holder>,
    },

    /// Deposit into custody
    Stake {
        /// Depositing account
        #[arg(long)]
        holder: Holder,

        /// Identifier of the multi-identifier asset (fungible when omitted)
        #[arg(long)]
        id: Option<u64>,

        /// Quantity in base units
        #[arg(short, long)]
        amount: Amount,
    },

    /// Withdraw a whole position
    Unstake {
        #[arg(long)]
        holder: Holder,

        /// Identifier of the multi-identifier asset (fungible when omitted)
        #[arg(long)]
        id: Option<u64>,
    },

    /// Show a holder's staked and external balances
    Balance {
        #[arg(long)]
        holder: Holder,

        /// Restrict to one identifier (fungible when omitted)
        #[arg(long)]
        id: Option<u64>,
    },

    /// Mint test supply
    Mint {
        /// Calling account (defaults to the configured owner)
        #[arg(long)]
        caller: Option<Holder>,

        /// Receiving account
        #[arg(long)]
        to: Holder,

        /// Identifier of the multi-identifier asset (fungible when omitted)
        #[arg(long)]
        id: Option<u64>,

        #[arg(short, long)]
        amount: Amount,
    },

    /// Mint several identifiers at once
    MintBatch {
        /// Calling account (defaults to the configured owner)
        #[arg(long)]
        caller: Option<Holder>,

        /// Receiving account
        #[arg(long)]
        to: Holder,

        /// Identifiers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,

        /// Quantities, one per identifier (comma-separated)
        #[arg(long, value_delimiter = ',')]
        amounts: Vec<Amount>,
    },

    /// Let custody pull up to AMOUNT of the holder's fungible balance
    Approve {
        #[arg(long)]
        holder: Holder,

        #[arg(short, long)]
        amount: Amount,
    },

    /// Grant custody operator rights over the holder's identifiers
    ApproveAll {
        #[arg(long)]
        holder: Holder,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },

    /// Compare recorded stakes with custody balances
    Audit,

    /// Export a framed snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), LedgerError> {
    let mut overrides = ConfigOverrides {
        database: cli.database.clone(),
        owner: cli.owner,
        ..ConfigOverrides::default()
    };
    if let Some(Commands::Server { host, port }) = &cli.command {
        overrides.host.clone_from(host);
        overrides.port = *port;
    }
    let config = AppConfig::load(cli.config.as_deref(), &overrides)?;
    let json_mode = cli.json_mode;
    let caller_or_owner = |caller: Option<Holder>| caller.unwrap_or(config.owner);

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&config, json_mode, force),
        Some(Commands::Server { .. }) => cmd_server(&config).await,
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
        Some(Commands::Pause { caller }) => {
            cmd_set_paused(&config, json_mode, &caller_or_owner(caller), true)
        }
        Some(Commands::Unpause { caller }) => {
            cmd_set_paused(&config, json_mode, &caller_or_owner(caller), false)
        }
        Some(Commands::Stake { holder, id, amount }) => {
            cmd_stake(&config, json_mode, &holder, id, amount)
        }
        Some(Commands::Unstake { holder, id }) => cmd_unstake(&config, json_mode, &holder, id),
        Some(Commands::Balance { holder, id }) => cmd_balance(&config, json_mode, &holder, id),
        Some(Commands::Mint {
            caller,
            to,
            id,
            amount,
        }) => cmd_mint(&config, &caller_or_owner(caller), &to, id, amount),
        Some(Commands::MintBatch {
            caller,
            to,
            ids,
            amounts,
        }) => cmd_mint_batch(&config, &caller_or_owner(caller), &to, &ids, &amounts),
        Some(Commands::Approve { holder, amount }) => cmd_approve(&config, &holder, amount),
        Some(Commands::ApproveAll { holder, revoke }) => {
            cmd_approve_all(&config, &holder, !revoke)
        }
        Some(Commands::Audit) => cmd_audit(&config, json_mode),
        Some(Commands::Export { output }) => cmd_export(&config, json_mode, &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_stake_by_id() {
        let holder = Holder::new([0x22; 20]);
        let cli = Cli::try_parse_from([
            "stakeledger",
            "stake",
            "--holder",
            &holder.to_string(),
            "--id",
            "1",
            "--amount",
            "50",
        ])
        .expect("parse");

        assert!(matches!(
            cli.command,
            Some(Commands::Stake { holder: h, id: Some(1), amount: 50 }) if h == holder
        ));
    }

    #[test]
    fn parses_batch_lists() {
        let to = Holder::new([0x33; 20]);
        let cli = Cli::try_parse_from([
            "stakeledger",
            "mint-batch",
            "--to",
            &to.to_string(),
            "--ids",
            "1,2,3",
            "--amounts",
            "10,20,30",
        ])
        .expect("parse");

        let Some(Commands::MintBatch {
            caller, ids, amounts, ..
        }) = cli.command
        else {
            unreachable!("parsed as mint-batch");
        };
        assert!(caller.is_none());
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(amounts, vec![10, 20, 30]);
    }

    #[test]
    fn rejects_malformed_holder() {
        assert!(Cli::try_parse_from(["stakeledger", "balance", "--holder", "0x12"]).is_err());
    }
}

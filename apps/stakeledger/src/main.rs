//! # stakeledger - custody ledger service
//!
//! The main binary for the stakeledger staking ledger.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for ledger operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │          apps/stakeledger (THE BINARY)        │
//! │                                               │
//! │   ┌─────────────┐        ┌─────────────┐      │
//! │   │    CLI      │        │  HTTP API   │      │
//! │   │   (clap)    │        │   (axum)    │      │
//! │   └──────┬──────┘        └──────┬──────┘      │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │            ┌───────────────────┐              │
//! │            │  stakeledger-core │              │
//! │            │    (THE LOGIC)    │              │
//! │            └───────────────────┘              │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stakeledger init
//! stakeledger server --host 0.0.0.0 --port 8080
//! stakeledger stake --holder 0x... --amount 100
//! stakeledger unpause
//! stakeledger unstake --holder 0x...
//! ```

use clap::Parser;
use stakeledger::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // STAKELEDGER_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("STAKELEDGER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stakeledger=info,stakeledger_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  stakeledger v{}
  custody for fungible and multi-identifier stakes
"#,
        env!("CARGO_PKG_VERSION")
    );
}

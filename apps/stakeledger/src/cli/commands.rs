//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the configured database, performs one operation and
//! checkpoints the asset fixtures if it changed anything. Only `init` and
//! `server` create a missing database; every other command refuses to run
//! without one.

use crate::api::{self, AuditResponse, BalanceResponse, PositionJson, StatusResponse};
use crate::config::AppConfig;
use stakeledger_core::{
    Amount, Asset, AssetAdapter, Deployment, Holder, LedgerError, StorageBackend, TokenId, audit,
    snapshot_checksum, snapshot_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// HELPERS
// =============================================================================

/// Open the configured database and restore or deploy the fixtures.
pub fn open_deployment(config: &AppConfig) -> Result<Deployment, LedgerError> {
    let backend = StorageBackend::open(&config.database)?;
    Deployment::deploy(backend, config.owner)
}

/// Open a database that `init` already created.
fn open_existing_deployment(config: &AppConfig) -> Result<Deployment, LedgerError> {
    if !config.database.is_file() {
        return Err(LedgerError::IoError(format!(
            "No stake database at {:?}. Run `stakeledger init` first.",
            config.database
        )));
    }
    open_deployment(config)
}

/// Validate an output path: the parent must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, LedgerError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        LedgerError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(LedgerError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| LedgerError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

fn status_response(ledger: &Deployment) -> Result<StatusResponse, LedgerError> {
    let summary = ledger.summary()?;
    Ok(StatusResponse::from_summary(
        ledger.owner(),
        ledger.custody(),
        (ledger.fungible().address(), ledger.multi().address()),
        ledger.is_paused(),
        ledger.is_persistent(),
        &summary,
    ))
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a database and deploy the fixtures.
pub fn cmd_init(config: &AppConfig, json_mode: bool, force: bool) -> Result<(), LedgerError> {
    let db_path = &config.database;
    if db_path.exists() {
        if !force {
            return Err(LedgerError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| LedgerError::IoError(format!("Remove existing database: {}", e)))?;
    }

    let ledger = open_deployment(config)?;

    if json_mode {
        print_json(&status_response(&ledger)?);
        return Ok(());
    }

    println!("Initialized stake database at {:?}", db_path);
    println!();
    println!("Owner:           {}", ledger.owner());
    println!("Custody:         {}", ledger.custody());
    println!("Fungible asset:  {}", ledger.fungible().address());
    println!("Multi asset:     {}", ledger.multi().address());
    println!("Withdrawals:     {}", ledger.pause_state().name());

    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), LedgerError> {
    let ledger = open_deployment(config)?;
    let addr = config.bind_address();

    println!("stakeledger server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", addr);
    println!("  Database: {:?}", config.database);
    println!("  Owner:    {}", ledger.owner());
    println!("  Custody:  {}", ledger.custody());
    println!();
    println!("Endpoints:");
    println!("  GET  /health             - Health check");
    println!("  GET  /status             - Ledger status");
    println!("  POST /admin/pause        - Close withdrawals");
    println!("  POST /admin/unpause      - Open withdrawals");
    println!("  POST /stake              - Deposit");
    println!("  POST /unstake            - Withdraw");
    println!("  GET  /stakes/{{holder}}    - Positions");
    println!("  GET  /audit              - Custody audit");
    println!("  POST /export             - Snapshot export");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(&addr, ledger).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show ledger status.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), LedgerError> {
    let ledger = open_existing_deployment(config)?;
    let status = status_response(&ledger)?;

    if json_mode {
        print_json(&status);
        return Ok(());
    }

    println!("stakeledger Status");
    println!("==================");
    println!("Database:    {:?}", config.database);
    println!("Owner:       {}", status.owner);
    println!("Custody:     {}", status.custody);
    println!("Withdrawals: {}", ledger.pause_state().name());
    println!();
    println!("Holders:     {}", status.holders);
    println!("Positions:   {}", status.positions);
    println!("Fungible:    {}", status.fungible_total);
    for total in &status.token_totals {
        println!("Token #{:<5} {}", total.id, total.amount);
    }

    Ok(())
}

// =============================================================================
// PAUSE COMMANDS
// =============================================================================

/// Close (`paused = true`) or open the withdrawal gate.
pub fn cmd_set_paused(
    config: &AppConfig,
    json_mode: bool,
    caller: &Holder,
    paused: bool,
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    let changed = if paused {
        ledger.pause(caller)?
    } else {
        ledger.unpause(caller)?
    };

    if json_mode {
        print_json(&serde_json::json!({
            "changed": changed,
            "paused": ledger.is_paused()
        }));
        return Ok(());
    }

    if changed {
        println!("Withdrawals are now {}", ledger.pause_state().name());
    } else {
        println!("Withdrawals already {}", ledger.pause_state().name());
    }
    Ok(())
}

// =============================================================================
// STAKE COMMANDS
// =============================================================================

/// Deposit into custody.
pub fn cmd_stake(
    config: &AppConfig,
    json_mode: bool,
    holder: &Holder,
    id: Option<u64>,
    amount: Amount,
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    let asset = Asset::from_id(id);
    let staked = ledger.stake(holder, asset, amount)?;
    ledger.checkpoint()?;

    if json_mode {
        print_json(&PositionJson::new(asset, staked));
        return Ok(());
    }

    println!("Staked {} of {} for {}", amount, asset, holder);
    println!("Position now: {}", staked);
    Ok(())
}

/// Withdraw a whole position.
pub fn cmd_unstake(
    config: &AppConfig,
    json_mode: bool,
    holder: &Holder,
    id: Option<u64>,
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    let asset = Asset::from_id(id);
    let returned = ledger.unstake(holder, asset)?;
    if returned > 0 {
        ledger.checkpoint()?;
    }

    if json_mode {
        print_json(&PositionJson::new(asset, returned));
        return Ok(());
    }

    if returned == 0 {
        println!("No {} stake for {}", asset, holder);
    } else {
        println!("Returned {} of {} to {}", returned, asset, holder);
    }
    Ok(())
}

/// Show one position plus every position the holder has.
pub fn cmd_balance(
    config: &AppConfig,
    json_mode: bool,
    holder: &Holder,
    id: Option<u64>,
) -> Result<(), LedgerError> {
    let ledger = open_existing_deployment(config)?;
    let asset = Asset::from_id(id);
    let balance = BalanceResponse {
        holder: holder.to_string(),
        asset: asset.class().name().to_string(),
        id,
        staked: ledger.staked(holder, asset)?,
        external: ledger.external_balance(holder, asset),
    };

    if json_mode {
        print_json(&balance);
        return Ok(());
    }

    println!("Holder:   {}", holder);
    println!("Asset:    {}", asset);
    println!("Staked:   {}", balance.staked);
    println!("External: {}", balance.external);

    let positions = ledger.positions(holder)?;
    if !positions.is_empty() {
        println!();
        println!("All positions:");
        for (asset, amount) in positions {
            println!("  {:<12} {}", asset.to_string(), amount);
        }
    }
    Ok(())
}

// =============================================================================
// TEST-ASSET COMMANDS
// =============================================================================

/// Mint test supply.
pub fn cmd_mint(
    config: &AppConfig,
    caller: &Holder,
    to: &Holder,
    id: Option<u64>,
    amount: Amount,
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    let asset = Asset::from_id(id);
    match asset {
        Asset::Fungible => ledger.mint_fungible(caller, to, amount)?,
        Asset::Token(id) => ledger.mint_token(caller, to, id, amount)?,
    }
    ledger.checkpoint()?;

    println!("Minted {} of {} to {}", amount, asset, to);
    Ok(())
}

/// Mint several identifiers at once.
pub fn cmd_mint_batch(
    config: &AppConfig,
    caller: &Holder,
    to: &Holder,
    ids: &[u64],
    amounts: &[Amount],
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    let ids: Vec<TokenId> = ids.iter().map(|&id| TokenId(id)).collect();
    ledger.mint_token_batch(caller, to, &ids, amounts)?;
    ledger.checkpoint()?;

    println!("Minted {} identifiers to {}", ids.len(), to);
    Ok(())
}

/// Let custody pull up to `amount` of the holder's fungible balance.
pub fn cmd_approve(config: &AppConfig, holder: &Holder, amount: Amount) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    ledger.approve_custody(holder, amount)?;
    ledger.checkpoint()?;

    println!("Custody allowance for {} set to {}", holder, amount);
    Ok(())
}

/// Grant or revoke custody operator rights.
pub fn cmd_approve_all(
    config: &AppConfig,
    holder: &Holder,
    approved: bool,
) -> Result<(), LedgerError> {
    let mut ledger = open_existing_deployment(config)?;
    ledger.approve_custody_all(holder, approved)?;
    ledger.checkpoint()?;

    if approved {
        println!("Custody approved as operator for {}", holder);
    } else {
        println!("Custody operator approval revoked for {}", holder);
    }
    Ok(())
}

// =============================================================================
// AUDIT COMMAND
// =============================================================================

/// Compare recorded stakes with the custody account's balances.
pub fn cmd_audit(config: &AppConfig, json_mode: bool) -> Result<(), LedgerError> {
    let ledger = open_existing_deployment(config)?;
    let report = audit(&ledger)?;

    if json_mode {
        print_json(&AuditResponse::from(&report));
        return Ok(());
    }

    println!("Custody Audit ({})", report.custody);
    println!("=============");
    for line in &report.assets {
        let mark = if line.is_covered() { "ok" } else { "SHORT" };
        println!(
            "  {:<12} staked {:>24}  held {:>24}  {}",
            line.asset.to_string(),
            line.staked,
            line.custody_balance,
            mark
        );
    }
    println!();
    if report.is_consistent() {
        println!("Custody covers every recorded stake");
    } else {
        println!("Custody is short for {} asset(s)", report.shortfalls().count());
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write a framed snapshot to `output`.
pub fn cmd_export(config: &AppConfig, json_mode: bool, output: &Path) -> Result<(), LedgerError> {
    let validated_output = validate_output_path(output)?;

    let ledger = open_existing_deployment(config)?;
    let bytes = snapshot_to_bytes(&ledger.snapshot()?)?;
    let checksum = snapshot_checksum(&bytes);

    std::fs::write(&validated_output, &bytes)
        .map_err(|e| LedgerError::IoError(format!("Write snapshot: {}", e)))?;

    if json_mode {
        print_json(&serde_json::json!({
            "output": validated_output.to_string_lossy(),
            "bytes": bytes.len(),
            "checksum": checksum
        }));
        return Ok(());
    }

    println!("Exported {} bytes to {:?}", bytes.len(), validated_output);
    println!("BLAKE3: {}", checksum);
    Ok(())
}

//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Accounts travel as `0x`-prefixed hex strings and are parsed at the
//! boundary; amounts are JSON integers (up to 128 bits).
//!
//! Request bodies never name the acting account. It comes from the API key,
//! and requests reject unknown fields so a body cannot claim one.

use serde::{Deserialize, Serialize};
use stakeledger_core::{
    Amount, Asset, AssetAudit, AuditReport, Holder, LedgerError, LedgerSummary, TokenId,
    primitives::MAX_BATCH_LENGTH,
};

/// Parse an account field, naming the field in the error.
fn parse_holder(field: &str, value: &str) -> Result<Holder, LedgerError> {
    value
        .parse::<Holder>()
        .map_err(|_| LedgerError::InvalidHolder(format!("{} '{}'", field, value)))
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSES
// =============================================================================

/// Total staked in one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotalJson {
    pub id: u64,
    pub amount: Amount,
}

/// Ledger status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub owner: String,
    pub custody: String,
    pub fungible_asset: String,
    pub multi_asset: String,
    pub paused: bool,
    pub persistent: bool,
    pub holders: usize,
    pub positions: usize,
    pub fungible_total: Amount,
    pub token_totals: Vec<TokenTotalJson>,
}

impl StatusResponse {
    pub fn from_summary(
        owner: Holder,
        custody: Holder,
        assets: (Holder, Holder),
        paused: bool,
        persistent: bool,
        summary: &LedgerSummary,
    ) -> Self {
        Self {
            owner: owner.to_string(),
            custody: custody.to_string(),
            fungible_asset: assets.0.to_string(),
            multi_asset: assets.1.to_string(),
            paused,
            persistent,
            holders: summary.holders,
            positions: summary.positions,
            fungible_total: summary.fungible_total,
            token_totals: summary
                .token_totals
                .iter()
                .map(|(id, amount)| TokenTotalJson {
                    id: id.0,
                    amount: *amount,
                })
                .collect(),
        }
    }
}

/// Withdrawal gate response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PausedResponse {
    pub paused: bool,
}

// =============================================================================
// ADMIN RESPONSE
// =============================================================================

/// Pause or unpause response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    /// Whether the call moved the gate.
    pub changed: bool,
    pub paused: bool,
    pub error: Option<String>,
}

impl AdminResponse {
    pub fn success(changed: bool, paused: bool) -> Self {
        Self {
            success: true,
            changed,
            paused,
            error: None,
        }
    }

    pub fn error(paused: bool, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            changed: false,
            paused,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STAKE REQUEST/RESPONSE
// =============================================================================

/// Deposit the caller's assets. Without `id` the fungible asset is staked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StakeRequest {
    #[serde(default)]
    pub id: Option<u64>,
    pub amount: Amount,
}

impl StakeRequest {
    #[must_use]
    pub fn asset(&self) -> Asset {
        Asset::from_id(self.id)
    }
}

/// Withdraw the caller's position. Without `id` the fungible stake is withdrawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnstakeRequest {
    #[serde(default)]
    pub id: Option<u64>,
}

impl UnstakeRequest {
    #[must_use]
    pub fn asset(&self) -> Asset {
        Asset::from_id(self.id)
    }
}

/// Stake or unstake response.
///
/// `amount` is the new stake after a deposit and the returned amount after
/// a withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeResponse {
    pub success: bool,
    pub asset: Option<String>,
    pub amount: Option<Amount>,
    pub error: Option<String>,
}

impl StakeResponse {
    pub fn success(asset: Asset, amount: Amount) -> Self {
        Self {
            success: true,
            asset: Some(asset.to_string()),
            amount: Some(amount),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            asset: None,
            amount: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// POSITION AND BALANCE RESPONSES
// =============================================================================

/// One stake position of a holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionJson {
    pub asset: String,
    pub id: Option<u64>,
    pub amount: Amount,
}

impl PositionJson {
    pub fn new(asset: Asset, amount: Amount) -> Self {
        Self {
            asset: asset.class().name().to_string(),
            id: asset.token_id().map(|id| id.0),
            amount,
        }
    }
}

/// All positions of one holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsResponse {
    pub holder: String,
    pub positions: Vec<PositionJson>,
}

/// Query string for `/balances/{holder}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceQuery {
    pub id: Option<u64>,
}

/// Staked and external balance of one holder in one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub holder: String,
    pub asset: String,
    pub id: Option<u64>,
    pub staked: Amount,
    pub external: Amount,
}

// =============================================================================
// TEST-ASSET REQUESTS
// =============================================================================

/// Mint test supply to `to`. Without `id` the fungible asset is minted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MintRequest {
    pub to: String,
    #[serde(default)]
    pub id: Option<u64>,
    pub amount: Amount,
}

impl MintRequest {
    pub fn to_parts(&self) -> Result<(Holder, Asset, Amount), LedgerError> {
        Ok((
            parse_holder("to", &self.to)?,
            Asset::from_id(self.id),
            self.amount,
        ))
    }
}

/// Mint several identifiers to `to` at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MintBatchRequest {
    pub to: String,
    pub ids: Vec<u64>,
    pub amounts: Vec<Amount>,
}

impl MintBatchRequest {
    /// Parse the recipient and bound the batch before it reaches the core.
    pub fn to_parts(&self) -> Result<(Holder, Vec<TokenId>), LedgerError> {
        if self.ids.len() > MAX_BATCH_LENGTH {
            return Err(LedgerError::InvalidAmount);
        }
        Ok((
            parse_holder("to", &self.to)?,
            self.ids.iter().map(|&id| TokenId(id)).collect(),
        ))
    }
}

/// Allow the custody account to pull up to `amount` of the caller's fungible balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveRequest {
    pub amount: Amount,
}

/// Grant or revoke the custody account as operator over the caller's identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveAllRequest {
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

/// Result of a test-asset operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl AssetResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// AUDIT RESPONSE
// =============================================================================

/// One audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLineJson {
    pub asset: String,
    pub id: Option<u64>,
    pub staked: Amount,
    pub custody_balance: Amount,
    pub covered: bool,
}

impl From<&AssetAudit> for AuditLineJson {
    fn from(line: &AssetAudit) -> Self {
        Self {
            asset: line.asset.class().name().to_string(),
            id: line.asset.token_id().map(|id| id.0),
            staked: line.staked,
            custody_balance: line.custody_balance,
            covered: line.is_covered(),
        }
    }
}

/// Custody audit response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResponse {
    pub consistent: bool,
    pub custody: String,
    pub assets: Vec<AuditLineJson>,
}

impl From<&AuditReport> for AuditResponse {
    fn from(report: &AuditReport) -> Self {
        Self {
            consistent: report.is_consistent(),
            custody: report.custody.to_string(),
            assets: report.assets.iter().map(AuditLineJson::from).collect(),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Snapshot export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    /// Base64-encoded framed snapshot.
    pub data: Option<String>,
    /// BLAKE3 hex digest of the framed bytes.
    pub checksum: Option<String>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8], checksum: String) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                data,
            )),
            checksum: Some(checksum),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}

/// Error body for requests rejected before reaching a handler-specific shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

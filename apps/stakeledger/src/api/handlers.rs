//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Handlers that act for an account take it from the [`Caller`] extractor,
//! never from the request body.
//!
//! Mutating handlers checkpoint the asset fixtures after a successful
//! operation. Stakes and the pause state are already durable at that point.

use super::{
    AppState,
    auth::Caller,
    types::{
        AdminResponse, ApproveAllRequest, ApproveRequest, AssetResponse,
        AuditResponse, BalanceQuery, BalanceResponse, ErrorResponse, ExportResponse,
        HealthResponse, MintBatchRequest, MintRequest, PausedResponse, PositionJson,
        PositionsResponse, StakeRequest, StakeResponse, StatusResponse, UnstakeRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use stakeledger_core::{
    Asset, AssetAdapter, Deployment, Holder, LedgerError, audit, snapshot_checksum,
    snapshot_to_bytes,
};

/// HTTP status for a ledger error.
pub(crate) fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        LedgerError::Paused => StatusCode::CONFLICT,
        LedgerError::InvalidAmount | LedgerError::InvalidHolder(_) => StatusCode::BAD_REQUEST,
        LedgerError::TransferFailed(_) | LedgerError::Overflow => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::MisconfiguredAdapter(_)
        | LedgerError::OwnerMismatch { .. }
        | LedgerError::Storage(_)
        | LedgerError::Serialization(_)
        | LedgerError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(err: &LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Persist the fixtures; a failure is logged and retried by the next checkpoint.
fn checkpoint(ledger: &mut Deployment) {
    if let Err(e) = ledger.checkpoint() {
        tracing::error!(event = "checkpoint_failed", error = %e, "Failed to persist asset fixtures");
    }
}

fn parse_path_holder(holder: &str) -> Result<Holder, LedgerError> {
    holder
        .parse()
        .map_err(|_| LedgerError::InvalidHolder(format!("holder '{}'", holder)))
}

// =============================================================================
// HEALTH AND STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Owner, custody, gate state and stake totals.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StatusResponse>), (StatusCode, Json<ErrorResponse>)> {
    let ledger = state.ledger.read().await;
    let summary = ledger.summary().map_err(|e| error_body(&e))?;

    let response = StatusResponse::from_summary(
        ledger.owner(),
        ledger.custody(),
        (ledger.fungible().address(), ledger.multi().address()),
        ledger.is_paused(),
        ledger.is_persistent(),
        &summary,
    );
    Ok((StatusCode::OK, Json(response)))
}

/// Withdrawal gate state.
pub async fn paused_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    Json(PausedResponse {
        paused: ledger.is_paused(),
    })
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

/// Close the withdrawal gate. Owner only.
pub async fn pause_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> impl IntoResponse {
    toggle(&state, &caller, true).await
}

/// Open the withdrawal gate. Owner only.
pub async fn unpause_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> impl IntoResponse {
    toggle(&state, &caller, false).await
}

async fn toggle(state: &AppState, caller: &Holder, pause: bool) -> (StatusCode, Json<AdminResponse>) {
    let mut ledger = state.ledger.write().await;

    let result = if pause {
        ledger.pause(caller)
    } else {
        ledger.unpause(caller)
    };

    match result {
        Ok(changed) => (
            StatusCode::OK,
            Json(AdminResponse::success(changed, ledger.is_paused())),
        ),
        Err(e) => (
            status_for(&e),
            Json(AdminResponse::error(ledger.is_paused(), e.to_string())),
        ),
    }
}

// =============================================================================
// STAKE HANDLERS
// =============================================================================

/// Deposit the caller's assets into custody.
pub async fn stake_handler(
    State(state): State<AppState>,
    Caller(holder): Caller,
    Json(request): Json<StakeRequest>,
) -> impl IntoResponse {
    let asset = request.asset();
    let mut ledger = state.ledger.write().await;
    match ledger.stake(&holder, asset, request.amount) {
        Ok(staked) => {
            checkpoint(&mut ledger);
            (StatusCode::OK, Json(StakeResponse::success(asset, staked)))
        }
        Err(e) => (
            status_for(&e),
            Json(StakeResponse::error(format!("Stake failed: {}", e))),
        ),
    }
}

/// Withdraw the caller's whole position. Refused while paused.
pub async fn unstake_handler(
    State(state): State<AppState>,
    Caller(holder): Caller,
    Json(request): Json<UnstakeRequest>,
) -> impl IntoResponse {
    let asset = request.asset();
    let mut ledger = state.ledger.write().await;
    match ledger.unstake(&holder, asset) {
        Ok(returned) => {
            if returned > 0 {
                checkpoint(&mut ledger);
            }
            (StatusCode::OK, Json(StakeResponse::success(asset, returned)))
        }
        Err(e) => (
            status_for(&e),
            Json(StakeResponse::error(format!("Unstake failed: {}", e))),
        ),
    }
}

/// All positions of one holder.
pub async fn positions_handler(
    State(state): State<AppState>,
    Path(holder): Path<String>,
) -> Result<(StatusCode, Json<PositionsResponse>), (StatusCode, Json<ErrorResponse>)> {
    let parsed = parse_path_holder(&holder).map_err(|e| error_body(&e))?;
    let ledger = state.ledger.read().await;
    let positions = ledger.positions(&parsed).map_err(|e| error_body(&e))?;

    Ok((
        StatusCode::OK,
        Json(PositionsResponse {
            holder: parsed.to_string(),
            positions: positions
                .into_iter()
                .map(|(asset, amount)| PositionJson::new(asset, amount))
                .collect(),
        }),
    ))
}

/// Staked and external balance of one position.
pub async fn balance_handler(
    State(state): State<AppState>,
    Path(holder): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<(StatusCode, Json<BalanceResponse>), (StatusCode, Json<ErrorResponse>)> {
    let parsed = parse_path_holder(&holder).map_err(|e| error_body(&e))?;
    let asset = Asset::from_id(query.id);
    let ledger = state.ledger.read().await;
    let staked = ledger.staked(&parsed, asset).map_err(|e| error_body(&e))?;

    Ok((
        StatusCode::OK,
        Json(BalanceResponse {
            holder: parsed.to_string(),
            asset: asset.class().name().to_string(),
            id: query.id,
            staked,
            external: ledger.external_balance(&parsed, asset),
        }),
    ))
}

// =============================================================================
// TEST-ASSET HANDLERS
// =============================================================================

fn asset_result(
    ledger: &mut Deployment,
    result: Result<(), LedgerError>,
) -> (StatusCode, Json<AssetResponse>) {
    match result {
        Ok(()) => {
            checkpoint(ledger);
            (StatusCode::OK, Json(AssetResponse::success()))
        }
        Err(e) => (status_for(&e), Json(AssetResponse::error(e.to_string()))),
    }
}

/// Mint test supply. Owner only.
pub async fn mint_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<MintRequest>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    let result = request
        .to_parts()
        .and_then(|(to, asset, amount)| match asset {
            Asset::Fungible => ledger.mint_fungible(&caller, &to, amount),
            Asset::Token(id) => ledger.mint_token(&caller, &to, id, amount),
        });
    asset_result(&mut ledger, result)
}

/// Mint several identifiers at once. Owner only.
pub async fn mint_batch_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<MintBatchRequest>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    let result = request
        .to_parts()
        .and_then(|(to, ids)| ledger.mint_token_batch(&caller, &to, &ids, &request.amounts));
    asset_result(&mut ledger, result)
}

/// Approve custody for the caller's fungible balance.
pub async fn approve_handler(
    State(state): State<AppState>,
    Caller(holder): Caller,
    Json(request): Json<ApproveRequest>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    let result = ledger.approve_custody(&holder, request.amount);
    asset_result(&mut ledger, result)
}

/// Grant or revoke custody as operator over the caller's identifiers.
pub async fn approve_all_handler(
    State(state): State<AppState>,
    Caller(holder): Caller,
    Json(request): Json<ApproveAllRequest>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    let result = ledger.approve_custody_all(&holder, request.approved);
    asset_result(&mut ledger, result)
}

// =============================================================================
// AUDIT AND EXPORT
// =============================================================================

/// Compare recorded stakes with the custody account's external balances.
pub async fn audit_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AuditResponse>), (StatusCode, Json<ErrorResponse>)> {
    let ledger = state.ledger.read().await;
    let report = audit(&*ledger).map_err(|e| error_body(&e))?;
    Ok((StatusCode::OK, Json(AuditResponse::from(&report))))
}

/// Export a framed snapshot of owner, custody, gate and positions.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;

    let bytes = match ledger.snapshot().and_then(|s| snapshot_to_bytes(&s)) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                status_for(&e),
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            );
        }
    };

    let checksum = snapshot_checksum(&bytes);
    (
        StatusCode::OK,
        Json(ExportResponse::success(&bytes, checksum)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakeledger_core::TransferError;

    #[test]
    fn error_statuses() {
        assert_eq!(
            status_for(&LedgerError::Unauthorized {
                caller: Holder::ZERO
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_for(&LedgerError::Paused), StatusCode::CONFLICT);
        assert_eq!(status_for(&LedgerError::InvalidAmount), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&LedgerError::TransferFailed(TransferError::InvalidRecipient)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&LedgerError::Storage("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&LedgerError::IoError("bind".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

//! # stakeledger HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Owner, custody, gate state and stake totals
//! - `GET /paused` - Withdrawal gate state
//! - `POST /admin/pause` - Close the withdrawal gate (owner)
//! - `POST /admin/unpause` - Open the withdrawal gate (owner)
//! - `POST /stake` - Deposit into custody
//! - `POST /unstake` - Withdraw a whole position
//! - `GET /stakes/{holder}` - All positions of a holder
//! - `GET /balances/{holder}?id=N` - Staked and external balance of one position
//! - `POST /assets/mint` - Mint test supply (owner)
//! - `POST /assets/mint-batch` - Mint several identifiers (owner)
//! - `POST /assets/approve` - Approve custody for the fungible asset
//! - `POST /assets/approve-all` - Approve custody as identifier operator
//! - `GET /audit` - Compare recorded stakes with custody balances
//! - `POST /export` - Export a framed snapshot
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `STAKELEDGER_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `STAKELEDGER_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `STAKELEDGER_API_KEY`: Bearer key of the ledger owner
//! - `STAKELEDGER_HOLDER_KEYS`: Comma-separated `key=0x<account>` Bearer keys for holders
//!
//! The account bound to the presented key is the caller of every operation.
//! Without any key the API only serves reads.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{Caller, KeyRing, get_api_key_from_env};
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
#[allow(unused_imports)]
pub use handlers::{
    approve_all_handler, approve_handler, audit_handler, balance_handler, export_handler,
    health_handler, mint_batch_handler, mint_handler, pause_handler, paused_handler,
    positions_handler, stake_handler, status_handler, unpause_handler, unstake_handler,
};
#[allow(unused_imports)]
pub use types::{
    AdminResponse, ApproveAllRequest, ApproveRequest, AssetResponse, AuditLineJson,
    AuditResponse, BalanceQuery, BalanceResponse, ErrorResponse, ExportResponse, HealthResponse,
    MintBatchRequest, MintRequest, PausedResponse, PositionJson, PositionsResponse, StakeRequest,
    StakeResponse, StatusResponse, TokenTotalJson, UnstakeRequest,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use stakeledger_core::{Deployment, Holder, LedgerError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    /// The deployment: ledger plus test-asset fixtures.
    pub ledger: Arc<RwLock<Deployment>>,
    /// Ledger owner, fixed for the deployment's lifetime.
    pub owner: Holder,
}

impl AppState {
    #[must_use]
    pub fn new(ledger: Deployment) -> Self {
        Self {
            owner: ledger.owner(),
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `STAKELEDGER_CORS_ORIGINS`.
///
/// "*" allows every origin, a comma-separated list allows those origins,
/// and anything else falls back to localhost only.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("STAKELEDGER_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (STAKELEDGER_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in STAKELEDGER_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No STAKELEDGER_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if any key is configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let keys = Arc::new(KeyRing::from_env(state.owner));
    let has_auth = !keys.is_empty();
    if has_auth {
        tracing::info!("API key authentication enabled: {} key(s)", keys.len());
    } else {
        tracing::warn!(
            "API key authentication DISABLED - reads are public and account operations are refused. \
             Set STAKELEDGER_API_KEY and STAKELEDGER_HOLDER_KEYS to enable them."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/paused", get(handlers::paused_handler))
        .route("/admin/pause", post(handlers::pause_handler))
        .route("/admin/unpause", post(handlers::unpause_handler))
        .route("/stake", post(handlers::stake_handler))
        .route("/unstake", post(handlers::unstake_handler))
        .route("/stakes/{holder}", get(handlers::positions_handler))
        .route("/balances/{holder}", get(handlers::balance_handler))
        .route("/assets/mint", post(handlers::mint_handler))
        .route("/assets/mint-batch", post(handlers::mint_batch_handler))
        .route("/assets/approve", post(handlers::approve_handler))
        .route("/assets/approve-all", post(handlers::approve_all_handler))
        .route("/audit", get(handlers::audit_handler))
        .route("/export", post(handlers::export_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn_with_state(
            keys,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Resolve on Ctrl-C so in-flight requests can finish.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Start the HTTP server.
pub async fn run_server(addr: &str, ledger: Deployment) -> Result<(), LedgerError> {
    let router = create_router(AppState::new(ledger));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LedgerError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("stakeledger HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LedgerError::IoError(format!("Server error: {}", e)))
}

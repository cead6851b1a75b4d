//! # Authentication Module
//!
//! API key authentication for the stakeledger HTTP API. Every key is bound
//! to one account, and that account is the caller of the request.
//!
//! - `STAKELEDGER_API_KEY`: key of the ledger owner
//! - `STAKELEDGER_HOLDER_KEYS`: comma-separated `key=0x<account>` pairs
//!
//! With at least one key configured, all requests except `/health` must send
//! `Authorization: Bearer <key>`. Without keys the reads stay open and every
//! operation that acts for an account answers 401.

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use stakeledger_core::Holder;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Get the owner's API key from `STAKELEDGER_API_KEY`, `None` when unset or empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("STAKELEDGER_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Compare two keys in constant time over the longer length.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// Parse `key=0x<account>` pairs. Malformed entries are logged and skipped.
///
/// The account follows the last `=`, so keys may carry base64 padding.
fn parse_holder_keys(raw: &str) -> Vec<(Vec<u8>, Holder)> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let Some((key, account)) = entry.rsplit_once('=') else {
                tracing::warn!("Holder key entry without '=' ignored");
                return None;
            };
            let key = key.trim();
            if key.is_empty() {
                tracing::warn!("Holder key entry with an empty key ignored");
                return None;
            }
            match account.trim().parse::<Holder>() {
                Ok(holder) => Some((key.as_bytes().to_vec(), holder)),
                Err(e) => {
                    tracing::warn!("Holder key entry with invalid account ignored: {}", e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// KEY RING
// =============================================================================

/// API keys and the accounts they act for.
#[derive(Default)]
pub struct KeyRing {
    entries: Vec<(Vec<u8>, Holder)>,
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl KeyRing {
    /// Build from `STAKELEDGER_API_KEY` (bound to `owner`) and
    /// `STAKELEDGER_HOLDER_KEYS`.
    pub fn from_env(owner: Holder) -> Self {
        let mut ring = Self::default();
        if let Some(key) = get_api_key_from_env() {
            ring.insert(key.as_bytes(), owner);
        }
        if let Ok(raw) = std::env::var("STAKELEDGER_HOLDER_KEYS") {
            for (key, holder) in parse_holder_keys(&raw) {
                ring.insert(&key, holder);
            }
        }
        ring
    }

    /// Bind `key` to `holder`. The first binding of a key wins.
    pub fn insert(&mut self, key: &[u8], holder: Holder) {
        if self.entries.iter().any(|(k, _)| k.as_slice() == key) {
            tracing::warn!(holder = %holder, "Duplicate API key ignored");
            return;
        }
        self.entries.push((key.to_vec(), holder));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The account bound to `provided`. Every key is compared.
    fn resolve(&self, provided: &[u8]) -> Option<Holder> {
        let mut found = None;
        for (key, holder) in &self.entries {
            if keys_match(provided, key) && found.is_none() {
                found = Some(*holder);
            }
        }
        found
    }
}

// =============================================================================
// CALLER EXTRACTOR
// =============================================================================

/// The account bound to the request's API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Holder);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Caller>().copied().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "This operation needs an API key bound to an account".to_string(),
                }),
            )
        })
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// API key authentication middleware.
///
/// On success the bound account is attached to the request as a [`Caller`].
pub async fn api_key_auth_middleware(
    State(keys): State<Arc<KeyRing>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
            match keys.resolve(provided.as_bytes()) {
                Some(holder) => {
                    tracing::debug!(caller = %holder, "Request authenticated");
                    request.extensions_mut().insert(Caller(holder));
                    Ok(next.run(request).await)
                }
                None => {
                    tracing::warn!(
                        event = "auth_failure",
                        reason = "invalid_api_key",
                        "Authentication failed: invalid API key"
                    );
                    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
                }
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

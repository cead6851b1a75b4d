//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use stakeledger::api::{
    AdminResponse, ApproveAllRequest, ApproveRequest, ExportResponse, HealthResponse,
    MintBatchRequest, MintRequest, PositionJson, StakeRequest, StakeResponse, UnstakeRequest,
};
use stakeledger_core::{Asset, Holder, LedgerError, TokenId, primitives::MAX_BATCH_LENGTH};

const ALICE: Holder = Holder::new([0x0a; 20]);

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// STAKE REQUEST TESTS
// =============================================================================

#[test]
fn test_stake_request_defaults_to_fungible() {
    let request: StakeRequest = serde_json::from_str(r#"{"amount":25}"#).unwrap();

    assert_eq!(request.asset(), Asset::Fungible);
    assert_eq!(request.amount, 25);
}

#[test]
fn test_stake_request_with_id() {
    let request: StakeRequest = serde_json::from_str(r#"{"id":7,"amount":1}"#).unwrap();
    assert_eq!(request.asset(), Asset::Token(TokenId(7)));
}

#[test]
fn test_stake_request_accepts_wide_amounts() {
    let request: StakeRequest =
        serde_json::from_str(r#"{"amount":1000000000000000000000000000}"#).unwrap();
    assert_eq!(request.amount, 1_000_000_000_000_000_000_000_000_000);
}

#[test]
fn test_requests_refuse_an_acting_account() {
    let holder = format!(r#"{{"holder":"{}","amount":1}}"#, ALICE);
    assert!(serde_json::from_str::<StakeRequest>(&holder).is_err());
    assert!(serde_json::from_str::<ApproveRequest>(&holder).is_err());

    let caller = format!(r#"{{"caller":"{}","to":"{}","amount":1}}"#, ALICE, ALICE);
    assert!(serde_json::from_str::<MintRequest>(&caller).is_err());

    let unstake = format!(r#"{{"holder":"{}"}}"#, ALICE);
    assert!(serde_json::from_str::<UnstakeRequest>(&unstake).is_err());
}

#[test]
fn test_unstake_request_empty_body_is_fungible() {
    let request: UnstakeRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(request.asset(), Asset::Fungible);
}

#[test]
fn test_stake_response_serialization() {
    let json = serde_json::to_string(&StakeResponse::success(Asset::Token(TokenId(2)), 9)).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"asset\":\"token#2\""));
    assert!(json.contains("\"amount\":9"));
    assert!(json.contains("\"error\":null"));

    let json = serde_json::to_string(&StakeResponse::error("boom")).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"error\":\"boom\""));
}

#[test]
fn test_position_json() {
    let fungible = PositionJson::new(Asset::Fungible, 5);
    assert_eq!(fungible.asset, "fungible");
    assert_eq!(fungible.id, None);

    let token = PositionJson::new(Asset::Token(TokenId(3)), 6);
    assert_eq!(token.id, Some(3));
}

// =============================================================================
// ADMIN AND ASSET TESTS
// =============================================================================

#[test]
fn test_admin_response_error_keeps_state() {
    let response = AdminResponse::error(true, "denied");
    assert!(!response.success);
    assert!(!response.changed);
    assert!(response.paused);
}

#[test]
fn test_mint_request_parts() {
    let request = MintRequest {
        to: Holder::new([0x0b; 20]).to_string(),
        id: Some(1),
        amount: 3,
    };
    let (to, asset, amount) = request.to_parts().unwrap();
    assert_eq!(to, Holder::new([0x0b; 20]));
    assert_eq!(asset, Asset::Token(TokenId(1)));
    assert_eq!(amount, 3);
}

#[test]
fn test_mint_request_bad_recipient() {
    let request = MintRequest {
        to: "0xnothex".to_string(),
        id: None,
        amount: 1,
    };
    assert!(matches!(
        request.to_parts(),
        Err(LedgerError::InvalidHolder(_))
    ));
}

#[test]
fn test_mint_batch_request_bounded() {
    let request = MintBatchRequest {
        to: ALICE.to_string(),
        ids: vec![1; MAX_BATCH_LENGTH + 1],
        amounts: vec![1; MAX_BATCH_LENGTH + 1],
    };
    assert!(matches!(request.to_parts(), Err(LedgerError::InvalidAmount)));
}

#[test]
fn test_approve_all_defaults_to_grant() {
    let request: ApproveAllRequest = serde_json::from_str("{}").unwrap();
    assert!(request.approved);
}

// =============================================================================
// EXPORT RESPONSE TESTS
// =============================================================================

#[test]
fn test_export_response_success() {
    let response = ExportResponse::success(&[1, 2, 3], "abc".to_string());
    assert!(response.success);
    assert_eq!(response.data.as_deref(), Some("AQID"));
    assert_eq!(response.checksum.as_deref(), Some("abc"));
    assert!(response.error.is_none());
}

#[test]
fn test_export_response_error() {
    let response = ExportResponse::error("Test error");
    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.error.as_deref(), Some("Test error"));
}

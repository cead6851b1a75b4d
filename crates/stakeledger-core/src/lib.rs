//! # stakeledger-core
//!
//! The deterministic staking ledger - THE LOGIC.
//!
//! This crate records per-holder stakes of a fungible asset and of a
//! multi-identifier asset, moves the underlying value through an
//! [`AssetAdapter`] per asset class, and gates withdrawals behind an
//! owner-controlled pause state.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Owns both stake mappings and the pause state; nothing else writes them
//! - Never credits a stake the adapter did not deliver
//! - Leaves state unchanged on every failed operation
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod access;
pub mod adapter;
pub mod audit;
pub mod formats;
pub mod ledger;
pub mod pause;
pub mod primitives;
pub mod store;
pub mod tokens;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Amount, Asset, AssetClass, Holder, LedgerError, PauseState, TokenId, TransferError};

// =============================================================================
// RE-EXPORTS: Ledger
// =============================================================================

pub use access::AccessGate;
pub use adapter::AssetAdapter;
pub use audit::{AssetAudit, AuditReport, audit};
pub use ledger::{Deployment, LedgerSummary, StakeLedger};
pub use pause::PauseGate;
pub use store::{MemoryStore, RedbStore, StakeStore, StorageBackend};
pub use tokens::{FungibleToken, MultiToken};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    LedgerSnapshot, PersistenceHeader, StakePosition, decode_framed, encode_framed,
    snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes,
};

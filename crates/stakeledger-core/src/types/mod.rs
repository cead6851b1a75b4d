//! # Core Type Definitions
//!
//! This module contains all core types for the stakeledger custody engine:
//! - Account and asset identifiers (`Holder`, `TokenId`, `Asset`, `AssetClass`)
//! - Withdrawal gate state (`PauseState`)
//! - Error types (`LedgerError`, `TransferError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Leave overflow to the caller as a checked, reportable failure

use crate::primitives::ADDRESS_DOMAIN;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Balance and quantity unit for both asset classes.
///
/// 128 bits hold the full fixture supply at 18 decimals with room to spare.
pub type Amount = u128;

// =============================================================================
// HOLDER
// =============================================================================

/// An account identifier (address-equivalent).
///
/// Human-readable encodings (JSON, TOML) use `0x`-prefixed lowercase hex;
/// binary encodings (postcard, redb) use the raw 20 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Holder(pub [u8; 20]);

impl Holder {
    /// The null account. Never a valid caller, recipient or custody account.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Number of raw bytes in an address.
    pub const LEN: usize = 20;

    /// Wrap raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic contract-style address from a deployer and a label.
    ///
    /// The custody account and both asset fixtures get their addresses this
    /// way, so a given owner always deploys to the same three addresses.
    #[must_use]
    pub fn derive(deployer: &Holder, label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ADDRESS_DOMAIN);
        hasher.update(&deployer.0);
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..Self::LEN]);
        Self(bytes)
    }

    /// Check whether this is the null account.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Get the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Reject the null account.
    pub fn ensure_nonzero(&self) -> Result<(), LedgerError> {
        if self.is_zero() {
            return Err(LedgerError::InvalidHolder(
                "the zero address is not a valid account".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Holder {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| LedgerError::InvalidHolder(format!("'{}': {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Holder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Holder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 20]>::deserialize(deserializer).map(Self)
        }
    }
}

// =============================================================================
// ASSET IDENTIFIERS
// =============================================================================

/// Identifier of a sub-asset within the multi-identifier asset class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two asset classes the ledger takes custody of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Interchangeable units, one running balance per holder.
    Fungible,
    /// Per-identifier balances.
    MultiToken,
}

impl AssetClass {
    /// Get the class name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Fungible => "fungible",
            AssetClass::MultiToken => "multi-token",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stake position key: the fungible asset, or one identifier of the
/// multi-identifier asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    Fungible,
    Token(TokenId),
}

impl Asset {
    /// Map an optional identifier to a position: `None` is the fungible asset.
    #[must_use]
    pub fn from_id(id: Option<u64>) -> Self {
        id.map_or(Asset::Fungible, |id| Asset::Token(TokenId(id)))
    }

    /// The asset class this position belongs to.
    #[must_use]
    pub fn class(&self) -> AssetClass {
        match self {
            Asset::Fungible => AssetClass::Fungible,
            Asset::Token(_) => AssetClass::MultiToken,
        }
    }

    /// The identifier, if this is a multi-identifier position.
    #[must_use]
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            Asset::Fungible => None,
            Asset::Token(id) => Some(*id),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Fungible => f.write_str("fungible"),
            Asset::Token(id) => write!(f, "token#{}", id),
        }
    }
}

// =============================================================================
// PAUSE STATE
// =============================================================================

/// State of the withdrawal gate.
///
/// A new ledger starts `Paused`: withdrawals stay closed until the owner
/// opens them explicitly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum PauseState {
    Active,
    #[default]
    Paused,
}

impl PauseState {
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self, PauseState::Paused)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PauseState::Active => "active",
            PauseState::Paused => "paused",
        }
    }
}

impl fmt::Display for PauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Reasons an asset adapter refuses to move value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("operator {operator} is not approved for {holder}")]
    NotApproved { holder: Holder, operator: Holder },

    #[error("asset {0} is not handled by this adapter")]
    UnsupportedAsset(Asset),

    #[error("transfer to the zero address")]
    InvalidRecipient,

    #[error("balance overflow")]
    Overflow,
}

/// Errors that can occur in the stakeledger system.
///
/// - No silent failures
/// - Use `Result<T, LedgerError>` for fallible operations
/// - A failed operation leaves ledger state unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An administrative operation was attempted by someone other than the owner.
    #[error("Unauthorized: {caller} is not the owner")]
    Unauthorized { caller: Holder },

    /// A withdrawal was attempted while the withdrawal gate is closed.
    #[error("Withdrawals are paused")]
    Paused,

    /// Zero quantity, or a batch whose shape is not allowed.
    #[error("Invalid amount")]
    InvalidAmount,

    /// The external asset adapter did not complete the movement.
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// An account identifier could not be parsed or is not allowed here.
    #[error("Invalid holder: {0}")]
    InvalidHolder(String),

    /// An adapter was wired to the wrong asset class.
    #[error("Adapter for {0} assets reports a different class")]
    MisconfiguredAdapter(AssetClass),

    /// Checked balance arithmetic overflowed.
    #[error("Arithmetic overflow")]
    Overflow,

    /// A persistent store was initialised for a different owner.
    #[error("Store belongs to owner {stored}, configured owner is {configured}")]
    OwnerMismatch { stored: Holder, configured: Holder },

    /// A storage backend error occurred.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file or socket operation outside the stake store failed.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_display_parse() {
        let holder = Holder::new([0xab; 20]);
        let text = holder.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Holder>().expect("parse"), holder);
    }

    #[test]
    fn holder_parse_without_prefix() {
        let parsed: Holder = "11".repeat(20).parse().expect("parse");
        assert_eq!(parsed, Holder::new([0x11; 20]));
    }

    #[test]
    fn holder_parse_rejects_bad_input() {
        assert!(matches!(
            "0x1234".parse::<Holder>(),
            Err(LedgerError::InvalidHolder(_))
        ));
        assert!(matches!(
            format!("0x{}", "zz".repeat(20)).parse::<Holder>(),
            Err(LedgerError::InvalidHolder(_))
        ));
    }

    #[test]
    fn holder_derive_is_deterministic() {
        let owner = Holder::new([7; 20]);
        assert_eq!(
            Holder::derive(&owner, "custody"),
            Holder::derive(&owner, "custody")
        );
        assert_ne!(
            Holder::derive(&owner, "custody"),
            Holder::derive(&owner, "fungible-asset")
        );
        assert!(!Holder::derive(&owner, "custody").is_zero());
    }

    #[test]
    fn holder_json_is_hex_string() {
        let holder = Holder::new([0x01; 20]);
        let json = serde_json::to_string(&holder).expect("encode");
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(20)));
        let decoded: Holder = serde_json::from_str(&json).expect("decode");
        assert_eq!(decoded, holder);
    }

    #[test]
    fn holder_postcard_is_raw_bytes() {
        let holder = Holder::new([0x42; 20]);
        let bytes = postcard::to_allocvec(&holder).expect("encode");
        assert_eq!(bytes, vec![0x42; 20]);
        let decoded: Holder = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, holder);
    }

    #[test]
    fn zero_holder_rejected() {
        assert!(Holder::ZERO.is_zero());
        assert!(Holder::ZERO.ensure_nonzero().is_err());
        assert!(Holder::new([1; 20]).ensure_nonzero().is_ok());
    }

    #[test]
    fn asset_class_mapping() {
        assert_eq!(Asset::Fungible.class(), AssetClass::Fungible);
        assert_eq!(Asset::Token(TokenId(2)).class(), AssetClass::MultiToken);
        assert_eq!(Asset::from_id(None), Asset::Fungible);
        assert_eq!(Asset::from_id(Some(7)), Asset::Token(TokenId(7)));
        assert_eq!(Asset::Token(TokenId(7)).token_id(), Some(TokenId(7)));
    }

    #[test]
    fn pause_state_defaults_to_paused() {
        assert_eq!(PauseState::default(), PauseState::Paused);
        assert!(PauseState::default().is_paused());
        assert!(!PauseState::Active.is_paused());
    }

    #[test]
    fn transfer_error_converts() {
        let err: LedgerError = TransferError::InvalidRecipient.into();
        assert!(matches!(err, LedgerError::TransferFailed(_)));
    }
}

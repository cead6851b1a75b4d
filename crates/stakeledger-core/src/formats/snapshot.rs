//! # Ledger Snapshot
//!
//! A point-in-time export of the ledger's durable state: owner, custody
//! account, pause flag and every non-zero stake position.

use super::persistence::{decode_framed, encode_framed};
use crate::types::{Amount, Asset, Holder, LedgerError, PauseState};
use serde::{Deserialize, Serialize};

/// One stake position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StakePosition {
    pub holder: Holder,
    pub asset: Asset,
    pub amount: Amount,
}

/// The full durable state of a ledger.
///
/// Positions are ordered by holder, then asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub owner: Holder,
    pub custody: Holder,
    pub pause: PauseState,
    pub positions: Vec<StakePosition>,
}

impl LedgerSnapshot {
    /// Sum of all positions in `asset`.
    pub fn total_staked(&self, asset: Asset) -> Result<Amount, LedgerError> {
        self.positions
            .iter()
            .filter(|p| p.asset == asset)
            .try_fold(0u128, |acc, p| {
                acc.checked_add(p.amount).ok_or(LedgerError::Overflow)
            })
    }
}

/// Serialize a snapshot to framed bytes.
pub fn snapshot_to_bytes(snapshot: &LedgerSnapshot) -> Result<Vec<u8>, LedgerError> {
    encode_framed(snapshot)
}

/// Deserialize a snapshot from framed bytes.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<LedgerSnapshot, LedgerError> {
    decode_framed(bytes)
}

/// BLAKE3 hex digest of the framed bytes.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenId;

    fn sample() -> LedgerSnapshot {
        let alice = Holder::new([2; 20]);
        LedgerSnapshot {
            owner: Holder::new([1; 20]),
            custody: Holder::new([9; 20]),
            pause: PauseState::Active,
            positions: vec![
                StakePosition {
                    holder: alice,
                    asset: Asset::Fungible,
                    amount: 100,
                },
                StakePosition {
                    holder: alice,
                    asset: Asset::Token(TokenId(1)),
                    amount: 40,
                },
            ],
        }
    }

    #[test]
    fn snapshot_bytes_decode() {
        let snapshot = sample();
        let bytes = snapshot_to_bytes(&snapshot).expect("encode");
        assert_eq!(snapshot_from_bytes(&bytes).expect("decode"), snapshot);
    }

    #[test]
    fn checksum_is_stable_and_sensitive() {
        let bytes = snapshot_to_bytes(&sample()).expect("encode");
        let checksum = snapshot_checksum(&bytes);
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, snapshot_checksum(&bytes));

        let mut other = sample();
        other.pause = PauseState::Paused;
        let other_bytes = snapshot_to_bytes(&other).expect("encode");
        assert_ne!(checksum, snapshot_checksum(&other_bytes));
    }

    #[test]
    fn total_staked_filters_by_asset() {
        let snapshot = sample();
        assert_eq!(snapshot.total_staked(Asset::Fungible).expect("sum"), 100);
        assert_eq!(
            snapshot.total_staked(Asset::Token(TokenId(1))).expect("sum"),
            40
        );
        assert_eq!(
            snapshot.total_staked(Asset::Token(TokenId(2))).expect("sum"),
            0
        );
    }
}

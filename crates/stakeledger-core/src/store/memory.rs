//! In-memory stake store.

use super::StakeStore;
use crate::types::{Amount, Asset, Holder, LedgerError, PauseState};
use std::collections::BTreeMap;

/// Volatile store backed by ordered maps.
///
/// `(Holder, Asset)` keys order fungible positions before token positions,
/// so iteration matches the redb backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    stakes: BTreeMap<(Holder, Asset), Amount>,
    pause: Option<PauseState>,
    owner: Option<Holder>,
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }
}

impl StakeStore for MemoryStore {
    fn stake(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        Ok(self.stakes.get(&(*holder, asset)).copied().unwrap_or(0))
    }

    fn set_stake(
        &mut self,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            self.stakes.remove(&(*holder, asset));
        } else {
            self.stakes.insert((*holder, asset), amount);
        }
        Ok(())
    }

    fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError> {
        Ok(self
            .stakes
            .range((*holder, Asset::Fungible)..)
            .take_while(|((h, _), _)| h == holder)
            .map(|((_, asset), amount)| (*asset, *amount))
            .collect())
    }

    fn all_positions(&self) -> Result<Vec<(Holder, Asset, Amount)>, LedgerError> {
        Ok(self
            .stakes
            .iter()
            .map(|((holder, asset), amount)| (*holder, *asset, *amount))
            .collect())
    }

    fn pause_state(&self) -> Result<Option<PauseState>, LedgerError> {
        Ok(self.pause)
    }

    fn set_pause_state(&mut self, state: PauseState) -> Result<(), LedgerError> {
        self.pause = Some(state);
        Ok(())
    }

    fn owner(&self) -> Result<Option<Holder>, LedgerError> {
        Ok(self.owner)
    }

    fn bind_owner(&mut self, owner: &Holder) -> Result<(), LedgerError> {
        self.owner = Some(*owner);
        Ok(())
    }

    fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn store_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenId;

    const ALICE: Holder = Holder::new([2; 20]);
    const BOB: Holder = Holder::new([3; 20]);

    #[test]
    fn zero_write_removes_entry() {
        let mut store = MemoryStore::new();
        store.set_stake(&ALICE, Asset::Fungible, 10).expect("set");
        assert_eq!(store.len(), 1);

        store.set_stake(&ALICE, Asset::Fungible, 0).expect("clear");
        assert!(store.is_empty());
        assert_eq!(store.stake(&ALICE, Asset::Fungible).expect("get"), 0);
    }

    #[test]
    fn positions_are_scoped_and_ordered() {
        let mut store = MemoryStore::new();
        store.set_stake(&ALICE, Asset::Token(TokenId(2)), 1).expect("set");
        store.set_stake(&ALICE, Asset::Fungible, 100).expect("set");
        store.set_stake(&ALICE, Asset::Token(TokenId(1)), 50).expect("set");
        store.set_stake(&BOB, Asset::Fungible, 7).expect("set");

        let positions = store.positions(&ALICE).expect("positions");
        assert_eq!(
            positions,
            vec![
                (Asset::Fungible, 100),
                (Asset::Token(TokenId(1)), 50),
                (Asset::Token(TokenId(2)), 1),
            ]
        );
        assert_eq!(store.all_positions().expect("all").len(), 4);
    }

    #[test]
    fn metadata_starts_unset() {
        let mut store = MemoryStore::new();
        assert_eq!(store.pause_state().expect("pause"), None);
        assert_eq!(store.owner().expect("owner"), None);

        store.set_pause_state(PauseState::Active).expect("set");
        store.bind_owner(&ALICE).expect("bind");
        assert_eq!(store.pause_state().expect("pause"), Some(PauseState::Active));
        assert_eq!(store.owner().expect("owner"), Some(ALICE));
    }
}

//! Stake store that refuses stake writes on demand.

use super::{MemoryStore, StakeStore};
use crate::types::{Amount, Asset, Holder, LedgerError, PauseState};

/// A [`MemoryStore`] whose `set_stake` starts failing after a write budget.
///
/// Every other operation passes straight through.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    stake_writes_left: Option<usize>,
}

impl FaultyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `writes` more stake writes, then fail every one after.
    pub fn fail_stake_writes_after(&mut self, writes: usize) {
        self.stake_writes_left = Some(writes);
    }
}

impl StakeStore for FaultyStore {
    fn stake(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        self.inner.stake(holder, asset)
    }

    fn set_stake(
        &mut self,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        match self.stake_writes_left {
            Some(0) => Err(LedgerError::Storage("stake write refused".to_string())),
            Some(left) => {
                self.stake_writes_left = Some(left - 1);
                self.inner.set_stake(holder, asset, amount)
            }
            None => self.inner.set_stake(holder, asset, amount),
        }
    }

    fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError> {
        self.inner.positions(holder)
    }

    fn all_positions(&self) -> Result<Vec<(Holder, Asset, Amount)>, LedgerError> {
        self.inner.all_positions()
    }

    fn pause_state(&self) -> Result<Option<PauseState>, LedgerError> {
        self.inner.pause_state()
    }

    fn set_pause_state(&mut self, state: PauseState) -> Result<(), LedgerError> {
        self.inner.set_pause_state(state)
    }

    fn owner(&self) -> Result<Option<Holder>, LedgerError> {
        self.inner.owner()
    }

    fn bind_owner(&mut self, owner: &Holder) -> Result<(), LedgerError> {
        self.inner.bind_owner(owner)
    }

    fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.inner.load_blob(key)
    }

    fn store_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.inner.store_blob(key, bytes)
    }
}

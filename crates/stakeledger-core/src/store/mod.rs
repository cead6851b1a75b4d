//! # Stake Storage
//!
//! The durable state of a ledger: both stake mappings, the pause flag, the
//! owner binding and an opaque blob slot for auxiliary state.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: `BTreeMap`-based, volatile, deterministic ordering
//! - [`RedbStore`]: redb-backed, one ACID transaction per write

#[cfg(test)]
pub(crate) mod faulty;
pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::{Amount, Asset, Holder, LedgerError, PauseState};
use std::path::Path;

/// Storage operations over stake positions and ledger metadata.
///
/// Writing a zero stake removes the entry; absent entries read as zero.
pub trait StakeStore {
    /// Current stake of `holder` in `asset`.
    fn stake(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError>;

    /// Overwrite the stake of `holder` in `asset`.
    fn set_stake(&mut self, holder: &Holder, asset: Asset, amount: Amount)
    -> Result<(), LedgerError>;

    /// Non-zero positions of one holder, fungible first, then by identifier.
    fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError>;

    /// Every non-zero position, ordered by holder then asset.
    fn all_positions(&self) -> Result<Vec<(Holder, Asset, Amount)>, LedgerError>;

    /// The persisted pause state, if one was ever written.
    fn pause_state(&self) -> Result<Option<PauseState>, LedgerError>;

    fn set_pause_state(&mut self, state: PauseState) -> Result<(), LedgerError>;

    /// The owner this store was initialised for, if any.
    fn owner(&self) -> Result<Option<Holder>, LedgerError>;

    fn bind_owner(&mut self, owner: &Holder) -> Result<(), LedgerError>;

    fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    fn store_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), LedgerError>;
}

/// Storage backend for a ledger.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
    #[cfg(test)]
    Faulty(faulty::FaultyStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open or create a redb-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        RedbStore::open(path).map(Self::Persistent)
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn StakeStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
            #[cfg(test)]
            Self::Faulty(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn StakeStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
            #[cfg(test)]
            Self::Faulty(s) => s,
        }
    }
}

impl StakeStore for StorageBackend {
    fn stake(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        self.store().stake(holder, asset)
    }

    fn set_stake(
        &mut self,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.store_mut().set_stake(holder, asset, amount)
    }

    fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError> {
        self.store().positions(holder)
    }

    fn all_positions(&self) -> Result<Vec<(Holder, Asset, Amount)>, LedgerError> {
        self.store().all_positions()
    }

    fn pause_state(&self) -> Result<Option<PauseState>, LedgerError> {
        self.store().pause_state()
    }

    fn set_pause_state(&mut self, state: PauseState) -> Result<(), LedgerError> {
        self.store_mut().set_pause_state(state)
    }

    fn owner(&self) -> Result<Option<Holder>, LedgerError> {
        self.store().owner()
    }

    fn bind_owner(&mut self, owner: &Holder) -> Result<(), LedgerError> {
        self.store_mut().bind_owner(owner)
    }

    fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        self.store().load_blob(key)
    }

    fn store_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.store_mut().store_blob(key, bytes)
    }
}

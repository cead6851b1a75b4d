//! # redb-backed Stake Storage
//!
//! A disk-backed stake store using the redb embedded database.
//!
//! Each write is its own ACID transaction. Keys are raw address bytes so
//! that positions of one holder are contiguous and can be read with a
//! single range scan.

use super::StakeStore;
use crate::types::{Amount, Asset, Holder, LedgerError, PauseState, TokenId};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};

/// Table for fungible stakes: holder bytes -> big-endian u128.
const FUNGIBLE_STAKES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("fungible_stakes");

/// Table for identifier stakes: holder bytes ++ big-endian id -> big-endian u128.
const TOKEN_STAKES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("token_stakes");

/// Table for ledger metadata (owner binding, pause flag).
const METADATA: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Table for opaque auxiliary state.
const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

const OWNER_KEY: &str = "owner";
const PAUSE_KEY: &str = "pause";

const TOKEN_KEY_LEN: usize = Holder::LEN + 8;

fn storage_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn token_key(holder: &Holder, id: TokenId) -> [u8; TOKEN_KEY_LEN] {
    let mut key = [0u8; TOKEN_KEY_LEN];
    key[..Holder::LEN].copy_from_slice(holder.as_bytes());
    key[Holder::LEN..].copy_from_slice(&id.0.to_be_bytes());
    key
}

fn split_token_key(bytes: &[u8]) -> Result<(Holder, TokenId), LedgerError> {
    if bytes.len() != TOKEN_KEY_LEN {
        return Err(LedgerError::Serialization(format!(
            "token stake key has {} bytes, expected {}",
            bytes.len(),
            TOKEN_KEY_LEN
        )));
    }
    let holder = decode_holder(&bytes[..Holder::LEN])?;
    let mut id = [0u8; 8];
    id.copy_from_slice(&bytes[Holder::LEN..]);
    Ok((holder, TokenId(u64::from_be_bytes(id))))
}

fn decode_holder(bytes: &[u8]) -> Result<Holder, LedgerError> {
    <[u8; Holder::LEN]>::try_from(bytes)
        .map(Holder::new)
        .map_err(|_| LedgerError::Serialization("malformed holder bytes".to_string()))
}

fn decode_amount(bytes: &[u8]) -> Result<Amount, LedgerError> {
    <[u8; 16]>::try_from(bytes)
        .map(Amount::from_be_bytes)
        .map_err(|_| LedgerError::Serialization("malformed stake amount".to_string()))
}

/// A disk-backed stake store using redb.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a stake database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(FUNGIBLE_STAKES).map_err(storage_err)?;
            let _ = write_txn.open_table(TOKEN_STAKES).map_err(storage_err)?;
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            let _ = write_txn.open_table(BLOBS).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        tracing::debug!(path = %path.display(), "opened redb stake store");
        Ok(Self { db, path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_metadata(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(METADATA).map_err(storage_err)?;
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .map(|guard| guard.value().to_vec()))
    }

    fn write_metadata(&mut self, key: &str, value: &[u8]) -> Result<(), LedgerError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(METADATA).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }
}

impl StakeStore for RedbStore {
    fn stake(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let guard = match asset {
            Asset::Fungible => {
                let table = read_txn.open_table(FUNGIBLE_STAKES).map_err(storage_err)?;
                table
                    .get(holder.as_bytes().as_slice())
                    .map_err(storage_err)?
                    .map(|g| g.value().to_vec())
            }
            Asset::Token(id) => {
                let table = read_txn.open_table(TOKEN_STAKES).map_err(storage_err)?;
                let key = token_key(holder, id);
                table
                    .get(key.as_slice())
                    .map_err(storage_err)?
                    .map(|g| g.value().to_vec())
            }
        };
        guard.map_or(Ok(0), |bytes| decode_amount(&bytes))
    }

    fn set_stake(
        &mut self,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let encoded = amount.to_be_bytes();
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let (mut table, key) = match asset {
                Asset::Fungible => (
                    write_txn.open_table(FUNGIBLE_STAKES).map_err(storage_err)?,
                    holder.as_bytes().to_vec(),
                ),
                Asset::Token(id) => (
                    write_txn.open_table(TOKEN_STAKES).map_err(storage_err)?,
                    token_key(holder, id).to_vec(),
                ),
            };
            if amount == 0 {
                table.remove(key.as_slice()).map_err(storage_err)?;
            } else {
                table
                    .insert(key.as_slice(), encoded.as_slice())
                    .map_err(storage_err)?;
            }
        }
        write_txn.commit().map_err(storage_err)
    }

    fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError> {
        let mut positions = Vec::new();
        let fungible = self.stake(holder, Asset::Fungible)?;
        if fungible > 0 {
            positions.push((Asset::Fungible, fungible));
        }

        let lo = token_key(holder, TokenId(0));
        let hi = token_key(holder, TokenId(u64::MAX));

        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(TOKEN_STAKES).map_err(storage_err)?;
        for entry in table
            .range(lo.as_slice()..=hi.as_slice())
            .map_err(storage_err)?
        {
            let (key, value) = entry.map_err(storage_err)?;
            let (_, id) = split_token_key(key.value())?;
            positions.push((Asset::Token(id), decode_amount(value.value())?));
        }
        Ok(positions)
    }

    fn all_positions(&self) -> Result<Vec<(Holder, Asset, Amount)>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let mut positions = Vec::new();

        let fungible = read_txn.open_table(FUNGIBLE_STAKES).map_err(storage_err)?;
        for entry in fungible.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            positions.push((
                decode_holder(key.value())?,
                Asset::Fungible,
                decode_amount(value.value())?,
            ));
        }

        let tokens = read_txn.open_table(TOKEN_STAKES).map_err(storage_err)?;
        for entry in tokens.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            let (holder, id) = split_token_key(key.value())?;
            positions.push((holder, Asset::Token(id), decode_amount(value.value())?));
        }

        positions.sort_by_key(|(holder, asset, _)| (*holder, *asset));
        Ok(positions)
    }

    fn pause_state(&self) -> Result<Option<PauseState>, LedgerError> {
        match self.read_metadata(PAUSE_KEY)?.as_deref() {
            None => Ok(None),
            Some([0]) => Ok(Some(PauseState::Active)),
            Some([1]) => Ok(Some(PauseState::Paused)),
            Some(other) => Err(LedgerError::Serialization(format!(
                "unknown pause flag {:?}",
                other
            ))),
        }
    }

    fn set_pause_state(&mut self, state: PauseState) -> Result<(), LedgerError> {
        let flag = u8::from(state.is_paused());
        self.write_metadata(PAUSE_KEY, &[flag])
    }

    fn owner(&self) -> Result<Option<Holder>, LedgerError> {
        self.read_metadata(OWNER_KEY)?
            .map(|bytes| decode_holder(&bytes))
            .transpose()
    }

    fn bind_owner(&mut self, owner: &Holder) -> Result<(), LedgerError> {
        self.write_metadata(OWNER_KEY, owner.as_bytes())
    }

    fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(BLOBS).map_err(storage_err)?;
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .map(|guard| guard.value().to_vec()))
    }

    fn store_blob(&mut self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(BLOBS).map_err(storage_err)?;
            table.insert(key, bytes).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ALICE: Holder = Holder::new([2; 20]);
    const BOB: Holder = Holder::new([3; 20]);

    fn open_temp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = RedbStore::open(dir.path().join("stakes.redb")).expect("open");
        (dir, store)
    }

    #[test]
    fn stake_roundtrip_and_removal() {
        let (_dir, mut store) = open_temp();

        store.set_stake(&ALICE, Asset::Fungible, 100).expect("set");
        store
            .set_stake(&ALICE, Asset::Token(TokenId(2)), 1)
            .expect("set");
        assert_eq!(store.stake(&ALICE, Asset::Fungible).expect("get"), 100);
        assert_eq!(store.stake(&ALICE, Asset::Token(TokenId(2))).expect("get"), 1);
        assert_eq!(store.stake(&BOB, Asset::Fungible).expect("get"), 0);

        store.set_stake(&ALICE, Asset::Fungible, 0).expect("clear");
        assert_eq!(
            store.positions(&ALICE).expect("positions"),
            vec![(Asset::Token(TokenId(2)), 1)]
        );
    }

    #[test]
    fn positions_scan_one_holder() {
        let (_dir, mut store) = open_temp();
        store.set_stake(&ALICE, Asset::Fungible, 5).expect("set");
        store
            .set_stake(&ALICE, Asset::Token(TokenId(u64::MAX)), 9)
            .expect("set");
        store
            .set_stake(&ALICE, Asset::Token(TokenId(1)), 3)
            .expect("set");
        store.set_stake(&BOB, Asset::Token(TokenId(1)), 4).expect("set");

        assert_eq!(
            store.positions(&ALICE).expect("positions"),
            vec![
                (Asset::Fungible, 5),
                (Asset::Token(TokenId(1)), 3),
                (Asset::Token(TokenId(u64::MAX)), 9),
            ]
        );
        assert_eq!(
            store.all_positions().expect("all"),
            vec![
                (ALICE, Asset::Fungible, 5),
                (ALICE, Asset::Token(TokenId(1)), 3),
                (ALICE, Asset::Token(TokenId(u64::MAX)), 9),
                (BOB, Asset::Token(TokenId(1)), 4),
            ]
        );
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("stakes.redb");

        {
            let mut store = RedbStore::open(&path).expect("open");
            store.bind_owner(&ALICE).expect("bind");
            store.set_pause_state(PauseState::Active).expect("pause");
            store.set_stake(&BOB, Asset::Fungible, 42).expect("set");
            store.store_blob("fixtures", b"payload").expect("blob");
        }

        let store = RedbStore::open(&path).expect("reopen");
        assert_eq!(store.owner().expect("owner"), Some(ALICE));
        assert_eq!(store.pause_state().expect("pause"), Some(PauseState::Active));
        assert_eq!(store.stake(&BOB, Asset::Fungible).expect("get"), 42);
        assert_eq!(
            store.load_blob("fixtures").expect("blob"),
            Some(b"payload".to_vec())
        );
        assert_eq!(store.load_blob("missing").expect("blob"), None);
    }

    #[test]
    fn fresh_store_has_no_metadata() {
        let (_dir, store) = open_temp();
        assert_eq!(store.owner().expect("owner"), None);
        assert_eq!(store.pause_state().expect("pause"), None);
    }
}

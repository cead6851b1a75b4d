//! # Stake Ledger
//!
//! Per-holder custody accounting for a fungible asset and a
//! multi-identifier asset.
//!
//! ## Operation Order
//!
//! Deposits pull from the adapter first and credit second, so a refused
//! pull never produces a credit. Withdrawals check the pause gate, zero the
//! stake, then push; a refused push restores the stake.
//!
//! Every mutating operation takes `&mut self` and adapters get no handle
//! back into the ledger, so an operation cannot be re-entered while it is
//! in flight.

use crate::access::AccessGate;
use crate::adapter::AssetAdapter;
use crate::formats::{LedgerSnapshot, StakePosition, decode_framed, encode_framed};
use crate::pause::PauseGate;
use crate::primitives::{CUSTODY_LABEL, FIXTURE_BLOB_KEY};
use crate::store::{StakeStore, StorageBackend};
use crate::tokens::{FungibleToken, MultiToken};
use crate::types::{Amount, Asset, AssetClass, Holder, LedgerError, PauseState, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SUMMARY
// =============================================================================

/// Aggregate view of every stake on the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Distinct holders with at least one non-zero position.
    pub holders: usize,
    /// Number of non-zero positions.
    pub positions: usize,
    pub fungible_total: Amount,
    pub token_totals: BTreeMap<TokenId, Amount>,
}

// =============================================================================
// LEDGER
// =============================================================================

/// The staking ledger.
///
/// `F` moves the fungible asset and `M` the multi-identifier asset. The
/// ledger owns both stake mappings and the pause state through its storage
/// backend; the adapters' own balances stay theirs.
#[derive(Debug)]
pub struct StakeLedger<F, M> {
    backend: StorageBackend,
    access: AccessGate,
    pause: PauseGate,
    custody: Holder,
    fungible: F,
    multi: M,
}

impl<F: AssetAdapter, M: AssetAdapter> StakeLedger<F, M> {
    /// Build a ledger over `backend`.
    ///
    /// A fresh backend is bound to `owner` and starts `Paused`. A backend
    /// that was initialised before must belong to the same owner.
    pub fn new(
        mut backend: StorageBackend,
        owner: Holder,
        custody: Holder,
        fungible: F,
        multi: M,
    ) -> Result<Self, LedgerError> {
        owner.ensure_nonzero()?;
        custody.ensure_nonzero()?;
        if custody == owner {
            return Err(LedgerError::InvalidHolder(
                "custody account must differ from the owner".to_string(),
            ));
        }
        if fungible.class() != AssetClass::Fungible {
            return Err(LedgerError::MisconfiguredAdapter(AssetClass::Fungible));
        }
        if multi.class() != AssetClass::MultiToken {
            return Err(LedgerError::MisconfiguredAdapter(AssetClass::MultiToken));
        }

        match backend.owner()? {
            Some(stored) if stored != owner => {
                return Err(LedgerError::OwnerMismatch {
                    stored,
                    configured: owner,
                });
            }
            Some(_) => {}
            None => backend.bind_owner(&owner)?,
        }

        let state = match backend.pause_state()? {
            Some(state) => state,
            None => {
                let initial = PauseState::default();
                backend.set_pause_state(initial)?;
                initial
            }
        };

        tracing::debug!(
            owner = %owner,
            custody = %custody,
            pause = %state,
            persistent = backend.is_persistent(),
            "ledger opened"
        );

        Ok(Self {
            backend,
            access: AccessGate::new(owner),
            pause: PauseGate::with_state(state),
            custody,
            fungible,
            multi,
        })
    }

    /// In-memory ledger with the custody account derived from `owner`.
    pub fn in_memory(owner: Holder, fungible: F, multi: M) -> Result<Self, LedgerError> {
        let custody = Holder::derive(&owner, CUSTODY_LABEL);
        Self::new(StorageBackend::default(), owner, custody, fungible, multi)
    }

    // -------------------------------------------------------------------------
    // Administrative surface
    // -------------------------------------------------------------------------

    /// Close withdrawals. Owner only. Returns `true` if the state changed.
    pub fn pause(&mut self, caller: &Holder) -> Result<bool, LedgerError> {
        let mut next = self.pause;
        let changed = next.pause(&self.access, caller)?;
        self.commit_pause(next, changed, "pause")
    }

    /// Open withdrawals. Owner only. Returns `true` if the state changed.
    pub fn unpause(&mut self, caller: &Holder) -> Result<bool, LedgerError> {
        let mut next = self.pause;
        let changed = next.unpause(&self.access, caller)?;
        self.commit_pause(next, changed, "unpause")
    }

    fn commit_pause(
        &mut self,
        next: PauseGate,
        changed: bool,
        event: &'static str,
    ) -> Result<bool, LedgerError> {
        if changed {
            self.backend.set_pause_state(next.state())?;
            self.pause = next;
            tracing::info!(event = event, state = %next.state(), "withdrawal gate changed");
        }
        Ok(changed)
    }

    // -------------------------------------------------------------------------
    // Deposits
    // -------------------------------------------------------------------------

    /// Deposit `amount` of the fungible asset. Returns the new stake.
    pub fn stake_fungible(&mut self, holder: &Holder, amount: Amount) -> Result<Amount, LedgerError> {
        self.stake(holder, Asset::Fungible, amount)
    }

    /// Deposit `quantity` of identifier `id`. Returns the new stake.
    pub fn stake_by_id(
        &mut self,
        holder: &Holder,
        id: TokenId,
        quantity: Amount,
    ) -> Result<Amount, LedgerError> {
        self.stake(holder, Asset::Token(id), quantity)
    }

    /// Deposit into any position. Open regardless of the pause state.
    pub fn stake(
        &mut self,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        self.ensure_holder(holder)?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let current = self.backend.stake(holder, asset)?;
        let credited = current.checked_add(amount).ok_or(LedgerError::Overflow)?;

        let custody = self.custody;
        self.adapter_mut(asset)
            .transfer_in(&custody, holder, asset, amount)?;

        if let Err(e) = self.backend.set_stake(holder, asset, credited) {
            match self
                .adapter_mut(asset)
                .transfer_out(&custody, holder, asset, amount)
            {
                Ok(()) => tracing::warn!(
                    event = "rollback",
                    holder = %holder,
                    asset = %asset,
                    amount = %amount,
                    error = %e,
                    "stake credit failed, deposit returned"
                ),
                Err(refund) => tracing::error!(
                    event = "rollback",
                    holder = %holder,
                    asset = %asset,
                    amount = %amount,
                    error = %e,
                    refund_error = %refund,
                    "stake credit failed and the deposit could not be returned"
                ),
            }
            return Err(e);
        }

        tracing::info!(
            event = "stake",
            holder = %holder,
            asset = %asset,
            amount = %amount,
            staked = %credited,
            "stake recorded"
        );
        Ok(credited)
    }

    // -------------------------------------------------------------------------
    // Withdrawals
    // -------------------------------------------------------------------------

    /// Withdraw the whole fungible stake. Returns the amount returned.
    pub fn unstake_fungible(&mut self, holder: &Holder) -> Result<Amount, LedgerError> {
        self.unstake(holder, Asset::Fungible)
    }

    /// Withdraw the whole stake in identifier `id`. Returns the quantity returned.
    pub fn unstake_by_id(&mut self, holder: &Holder, id: TokenId) -> Result<Amount, LedgerError> {
        self.unstake(holder, Asset::Token(id))
    }

    /// Withdraw the whole stake in one position.
    ///
    /// Fails with `Paused` while the gate is closed. An empty position is a
    /// successful no-op returning zero.
    pub fn unstake(&mut self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        if self.pause.is_paused() {
            return Err(LedgerError::Paused);
        }
        self.ensure_holder(holder)?;

        let amount = self.backend.stake(holder, asset)?;
        if amount == 0 {
            tracing::debug!(holder = %holder, asset = %asset, "nothing staked, unstake is a no-op");
            return Ok(0);
        }

        self.backend.set_stake(holder, asset, 0)?;

        let custody = self.custody;
        if let Err(e) = self
            .adapter_mut(asset)
            .transfer_out(&custody, holder, asset, amount)
        {
            if let Err(restore) = self.backend.set_stake(holder, asset, amount) {
                tracing::error!(
                    event = "rollback",
                    holder = %holder,
                    asset = %asset,
                    amount = %amount,
                    error = %e,
                    restore_error = %restore,
                    "withdrawal refused by adapter and the stake could not be restored"
                );
                return Err(restore);
            }
            tracing::warn!(
                event = "rollback",
                holder = %holder,
                asset = %asset,
                amount = %amount,
                error = %e,
                "withdrawal refused by adapter, stake restored"
            );
            return Err(e.into());
        }

        tracing::info!(
            event = "unstake",
            holder = %holder,
            asset = %asset,
            amount = %amount,
            "stake withdrawn"
        );
        Ok(amount)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn owner(&self) -> Holder {
        self.access.owner()
    }

    #[must_use]
    pub fn custody(&self) -> Holder {
        self.custody
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    #[must_use]
    pub fn pause_state(&self) -> PauseState {
        self.pause.state()
    }

    /// Check if the stakes live in a persistent store.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    pub fn staked(&self, holder: &Holder, asset: Asset) -> Result<Amount, LedgerError> {
        self.backend.stake(holder, asset)
    }

    pub fn fungible_stake(&self, holder: &Holder) -> Result<Amount, LedgerError> {
        self.staked(holder, Asset::Fungible)
    }

    pub fn token_stake(&self, holder: &Holder, id: TokenId) -> Result<Amount, LedgerError> {
        self.staked(holder, Asset::Token(id))
    }

    pub fn positions(&self, holder: &Holder) -> Result<Vec<(Asset, Amount)>, LedgerError> {
        self.backend.positions(holder)
    }

    /// Totals across every holder.
    pub fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        let mut summary = LedgerSummary::default();
        let mut holders = BTreeSet::new();

        for (holder, asset, amount) in self.backend.all_positions()? {
            holders.insert(holder);
            summary.positions += 1;
            match asset {
                Asset::Fungible => {
                    summary.fungible_total = summary
                        .fungible_total
                        .checked_add(amount)
                        .ok_or(LedgerError::Overflow)?;
                }
                Asset::Token(id) => {
                    let total = summary.token_totals.entry(id).or_insert(0);
                    *total = total.checked_add(amount).ok_or(LedgerError::Overflow)?;
                }
            }
        }

        summary.holders = holders.len();
        Ok(summary)
    }

    /// The holder's balance at the adapter, outside the ledger.
    #[must_use]
    pub fn external_balance(&self, holder: &Holder, asset: Asset) -> Amount {
        match asset.class() {
            AssetClass::Fungible => self.fungible.balance_of(holder, asset),
            AssetClass::MultiToken => self.multi.balance_of(holder, asset),
        }
    }

    /// Point-in-time export of owner, custody, pause state and positions.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let positions = self
            .backend
            .all_positions()?
            .into_iter()
            .map(|(holder, asset, amount)| StakePosition {
                holder,
                asset,
                amount,
            })
            .collect();

        Ok(LedgerSnapshot {
            owner: self.owner(),
            custody: self.custody,
            pause: self.pause_state(),
            positions,
        })
    }

    // -------------------------------------------------------------------------
    // Adapters
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn fungible(&self) -> &F {
        &self.fungible
    }

    pub fn fungible_mut(&mut self) -> &mut F {
        &mut self.fungible
    }

    #[must_use]
    pub fn multi(&self) -> &M {
        &self.multi
    }

    pub fn multi_mut(&mut self) -> &mut M {
        &mut self.multi
    }

    fn adapter_mut(&mut self, asset: Asset) -> &mut dyn AssetAdapter {
        match asset.class() {
            AssetClass::Fungible => &mut self.fungible,
            AssetClass::MultiToken => &mut self.multi,
        }
    }

    fn ensure_holder(&self, holder: &Holder) -> Result<(), LedgerError> {
        holder.ensure_nonzero()?;
        if *holder == self.custody {
            return Err(LedgerError::InvalidHolder(
                "the custody account cannot hold a stake".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// DEPLOYMENT WITH TEST-ASSET FIXTURES
// =============================================================================

/// A ledger wired to the in-process test-asset fixtures.
pub type Deployment = StakeLedger<FungibleToken, MultiToken>;

#[derive(Serialize)]
struct FixtureStateRef<'a> {
    fungible: &'a FungibleToken,
    multi: &'a MultiToken,
}

#[derive(Deserialize)]
struct FixtureState {
    fungible: FungibleToken,
    multi: MultiToken,
}

impl StakeLedger<FungibleToken, MultiToken> {
    /// Open a deployment over `backend`.
    ///
    /// Fixtures are restored from the backend's checkpoint when one exists,
    /// otherwise deployed fresh with `owner` as deployer and checkpointed.
    pub fn deploy(backend: StorageBackend, owner: Holder) -> Result<Self, LedgerError> {
        let restored = match backend.load_blob(FIXTURE_BLOB_KEY)? {
            Some(bytes) => Some(decode_framed::<FixtureState>(&bytes)?),
            None => None,
        };
        let fresh = restored.is_none();

        let (fungible, multi) = match restored {
            Some(state) => (state.fungible, state.multi),
            None => (FungibleToken::deploy(owner)?, MultiToken::deploy(owner)?),
        };

        let custody = Holder::derive(&owner, CUSTODY_LABEL);
        let mut ledger = Self::new(backend, owner, custody, fungible, multi)?;

        if fresh {
            ledger.checkpoint()?;
            tracing::info!(
                event = "deploy",
                owner = %owner,
                custody = %custody,
                fungible = %ledger.fungible.address(),
                multi = %ledger.multi.address(),
                "test-asset fixtures deployed"
            );
        }
        Ok(ledger)
    }

    /// Persist both fixtures into the backend's blob slot.
    pub fn checkpoint(&mut self) -> Result<(), LedgerError> {
        let bytes = encode_framed(&FixtureStateRef {
            fungible: &self.fungible,
            multi: &self.multi,
        })?;
        self.backend.store_blob(FIXTURE_BLOB_KEY, &bytes)
    }

    /// Mint fungible test supply. Owner only.
    pub fn mint_fungible(
        &mut self,
        caller: &Holder,
        to: &Holder,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.fungible.mint(caller, to, amount)?;
        tracing::info!(event = "mint", to = %to, asset = %Asset::Fungible, amount = %amount, "test supply minted");
        Ok(())
    }

    /// Mint test supply of one identifier. Owner only.
    pub fn mint_token(
        &mut self,
        caller: &Holder,
        to: &Holder,
        id: TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.multi.mint(caller, to, id, amount)?;
        tracing::info!(event = "mint", to = %to, asset = %Asset::Token(id), amount = %amount, "test supply minted");
        Ok(())
    }

    /// Mint test supply of several identifiers at once. Owner only.
    pub fn mint_token_batch(
        &mut self,
        caller: &Holder,
        to: &Holder,
        ids: &[TokenId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.multi.mint_batch(caller, to, ids, amounts)?;
        tracing::info!(event = "mint", to = %to, entries = ids.len(), "test supply batch minted");
        Ok(())
    }

    /// Let the custody account pull up to `amount` of `holder`'s fungible balance.
    pub fn approve_custody(&mut self, holder: &Holder, amount: Amount) -> Result<(), LedgerError> {
        let custody = self.custody;
        self.fungible.approve(holder, &custody, amount)
    }

    /// Grant or revoke the custody account as operator over `holder`'s identifiers.
    pub fn approve_custody_all(
        &mut self,
        holder: &Holder,
        approved: bool,
    ) -> Result<(), LedgerError> {
        let custody = self.custody;
        self.multi.set_approval_for_all(holder, &custody, approved)
    }
}

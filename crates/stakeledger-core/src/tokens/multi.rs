//! Multi-identifier test asset: per-identifier balances with operator approval.

use crate::access::AccessGate;
use crate::adapter::AssetAdapter;
use crate::primitives::{
    COLLECTIBLE_SUPPLY, COLLECTIBLE_TOKEN_ID, INITIAL_SUPPLY, MAX_BATCH_LENGTH, MULTI_TOKEN_LABEL,
    MULTI_TOKEN_URI, PRIMARY_TOKEN_ID,
};
use crate::types::{Amount, Asset, AssetClass, Holder, LedgerError, TokenId, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Balance ledger for the multi-identifier asset class.
///
/// Each identifier carries its own balances and supply. An operator approved
/// by a holder may move any identifier out of that holder's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiToken {
    address: Holder,
    access: AccessGate,
    balances: BTreeMap<(Holder, TokenId), Amount>,
    supply: BTreeMap<TokenId, Amount>,
    operators: BTreeSet<(Holder, Holder)>,
}

impl MultiToken {
    /// Deploy the fixture: the bulk identifier and the single collectible go
    /// to `deployer`.
    pub fn deploy(deployer: Holder) -> Result<Self, LedgerError> {
        deployer.ensure_nonzero()?;

        let mut token = Self {
            address: Holder::derive(&deployer, MULTI_TOKEN_LABEL),
            access: AccessGate::new(deployer),
            balances: BTreeMap::new(),
            supply: BTreeMap::new(),
            operators: BTreeSet::new(),
        };
        token.credit_batch(
            &deployer,
            &[PRIMARY_TOKEN_ID, COLLECTIBLE_TOKEN_ID],
            &[INITIAL_SUPPLY, COLLECTIBLE_SUPPLY],
        )?;
        Ok(token)
    }

    /// Metadata URI template, identical for every identifier.
    #[must_use]
    pub fn uri(&self, _id: TokenId) -> &'static str {
        MULTI_TOKEN_URI
    }

    #[must_use]
    pub fn owner(&self) -> Holder {
        self.access.owner()
    }

    #[must_use]
    pub fn balance_of(&self, holder: &Holder, id: TokenId) -> Amount {
        self.balances.get(&(*holder, id)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_supply(&self, id: TokenId) -> Amount {
        self.supply.get(&id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_approved_for_all(&self, holder: &Holder, operator: &Holder) -> bool {
        self.operators.contains(&(*holder, *operator))
    }

    /// Grant or revoke `operator`'s right to move all of `holder`'s identifiers.
    pub fn set_approval_for_all(
        &mut self,
        holder: &Holder,
        operator: &Holder,
        approved: bool,
    ) -> Result<(), LedgerError> {
        holder.ensure_nonzero()?;
        operator.ensure_nonzero()?;
        if holder == operator {
            return Err(LedgerError::InvalidHolder(
                "an account cannot set approval for itself".to_string(),
            ));
        }
        if approved {
            self.operators.insert((*holder, *operator));
        } else {
            self.operators.remove(&(*holder, *operator));
        }
        Ok(())
    }

    /// Create `amount` of `id` for `to`. Owner only.
    pub fn mint(
        &mut self,
        caller: &Holder,
        to: &Holder,
        id: TokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.mint_batch(caller, to, &[id], &[amount])
    }

    /// Create several identifiers for `to` in one step. Owner only.
    ///
    /// `ids` and `amounts` pair up by position and must have equal, non-zero
    /// length. Either every entry is minted or none is.
    pub fn mint_batch(
        &mut self,
        caller: &Holder,
        to: &Holder,
        ids: &[TokenId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        to.ensure_nonzero()?;
        self.credit_batch(to, ids, amounts)
    }

    /// Move `amount` of `id` from `from` to `to`.
    ///
    /// `operator` must be `from` itself or an approved operator of `from`.
    pub fn safe_transfer_from(
        &mut self,
        operator: &Holder,
        from: &Holder,
        to: &Holder,
        id: TokenId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if operator != from && !self.is_approved_for_all(from, operator) {
            return Err(TransferError::NotApproved {
                holder: *from,
                operator: *operator,
            });
        }
        if to.is_zero() {
            return Err(TransferError::InvalidRecipient);
        }
        let have = self.balance_of(from, id);
        if have < amount {
            return Err(TransferError::InsufficientBalance { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to, id)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.set_balance(*from, id, have - amount);
        self.set_balance(*to, id, credited);
        Ok(())
    }

    /// Stage every credit, then apply. Duplicate identifiers accumulate.
    fn credit_batch(
        &mut self,
        to: &Holder,
        ids: &[TokenId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        if ids.is_empty() || ids.len() != amounts.len() || ids.len() > MAX_BATCH_LENGTH {
            return Err(LedgerError::InvalidAmount);
        }

        let mut balances: BTreeMap<TokenId, Amount> = BTreeMap::new();
        let mut supply: BTreeMap<TokenId, Amount> = BTreeMap::new();
        for (&id, &amount) in ids.iter().zip(amounts) {
            if amount == 0 {
                return Err(LedgerError::InvalidAmount);
            }
            let balance = balances
                .get(&id)
                .copied()
                .unwrap_or_else(|| self.balance_of(to, id));
            let total = supply
                .get(&id)
                .copied()
                .unwrap_or_else(|| self.total_supply(id));

            balances.insert(id, balance.checked_add(amount).ok_or(LedgerError::Overflow)?);
            supply.insert(id, total.checked_add(amount).ok_or(LedgerError::Overflow)?);
        }

        for (id, balance) in balances {
            self.set_balance(*to, id, balance);
        }
        self.supply.extend(supply);
        Ok(())
    }

    fn set_balance(&mut self, holder: Holder, id: TokenId, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&(holder, id));
        } else {
            self.balances.insert((holder, id), amount);
        }
    }
}

impl AssetAdapter for MultiToken {
    fn class(&self) -> AssetClass {
        AssetClass::MultiToken
    }

    fn address(&self) -> Holder {
        self.address
    }

    fn transfer_in(
        &mut self,
        custody: &Holder,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), TransferError> {
        match asset {
            Asset::Token(id) => self.safe_transfer_from(custody, holder, custody, id, amount),
            other => Err(TransferError::UnsupportedAsset(other)),
        }
    }

    fn transfer_out(
        &mut self,
        custody: &Holder,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), TransferError> {
        match asset {
            Asset::Token(id) => self.safe_transfer_from(custody, custody, holder, id, amount),
            other => Err(TransferError::UnsupportedAsset(other)),
        }
    }

    fn balance_of(&self, holder: &Holder, asset: Asset) -> Amount {
        match asset {
            Asset::Token(id) => MultiToken::balance_of(self, holder, id),
            Asset::Fungible => 0,
        }
    }
}

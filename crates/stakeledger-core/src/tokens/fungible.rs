//! Fungible test asset: one running balance per account, with spend allowances.

use crate::access::AccessGate;
use crate::adapter::AssetAdapter;
use crate::primitives::{
    FUNGIBLE_LABEL, FUNGIBLE_NAME, FUNGIBLE_SYMBOL, INITIAL_SUPPLY, TOKEN_DECIMALS,
};
use crate::types::{Amount, Asset, AssetClass, Holder, LedgerError, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance ledger for the fungible asset class.
///
/// The deployer is the owner and the only account allowed to mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleToken {
    address: Holder,
    access: AccessGate,
    total_supply: Amount,
    balances: BTreeMap<Holder, Amount>,
    allowances: BTreeMap<(Holder, Holder), Amount>,
}

impl FungibleToken {
    /// Deploy the fixture: the whole initial supply goes to `deployer`.
    pub fn deploy(deployer: Holder) -> Result<Self, LedgerError> {
        deployer.ensure_nonzero()?;

        let mut balances = BTreeMap::new();
        balances.insert(deployer, INITIAL_SUPPLY);

        Ok(Self {
            address: Holder::derive(&deployer, FUNGIBLE_LABEL),
            access: AccessGate::new(deployer),
            total_supply: INITIAL_SUPPLY,
            balances,
            allowances: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        FUNGIBLE_NAME
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        FUNGIBLE_SYMBOL
    }

    #[must_use]
    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    #[must_use]
    pub fn owner(&self) -> Holder {
        self.access.owner()
    }

    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    #[must_use]
    pub fn balance_of(&self, holder: &Holder) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn allowance(&self, holder: &Holder, spender: &Holder) -> Amount {
        self.allowances
            .get(&(*holder, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Create `amount` new units for `to`. Owner only.
    ///
    /// Any non-zero account may receive, including the token's own address.
    pub fn mint(&mut self, caller: &Holder, to: &Holder, amount: Amount) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        to.ensure_nonzero()?;
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_supply = supply;
        self.balances.insert(*to, balance);
        Ok(())
    }

    /// Set the amount `spender` may move out of `holder`'s balance.
    pub fn approve(
        &mut self,
        holder: &Holder,
        spender: &Holder,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        holder.ensure_nonzero()?;
        spender.ensure_nonzero()?;
        if amount == 0 {
            self.allowances.remove(&(*holder, *spender));
        } else {
            self.allowances.insert((*holder, *spender), amount);
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to` on `from`'s own authority.
    pub fn transfer(
        &mut self,
        from: &Holder,
        to: &Holder,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.move_balance(from, to, amount)
    }

    /// Move `amount` from `from` to `to` on `spender`'s allowance.
    ///
    /// An allowance of `Amount::MAX` is treated as unlimited and is not consumed.
    pub fn transfer_from(
        &mut self,
        spender: &Holder,
        from: &Holder,
        to: &Holder,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TransferError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }

        self.move_balance(from, to, amount)?;

        if allowed != Amount::MAX {
            let remaining = allowed - amount;
            if remaining == 0 {
                self.allowances.remove(&(*from, *spender));
            } else {
                self.allowances.insert((*from, *spender), remaining);
            }
        }
        Ok(())
    }

    /// All checks run before either balance is touched.
    fn move_balance(
        &mut self,
        from: &Holder,
        to: &Holder,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if to.is_zero() {
            return Err(TransferError::InvalidRecipient);
        }
        let have = self.balance_of(from);
        if have < amount {
            return Err(TransferError::InsufficientBalance { have, need: amount });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        set_or_remove(&mut self.balances, *from, have - amount);
        set_or_remove(&mut self.balances, *to, credited);
        Ok(())
    }
}

fn set_or_remove(balances: &mut BTreeMap<Holder, Amount>, holder: Holder, amount: Amount) {
    if amount == 0 {
        balances.remove(&holder);
    } else {
        balances.insert(holder, amount);
    }
}

impl AssetAdapter for FungibleToken {
    fn class(&self) -> AssetClass {
        AssetClass::Fungible
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
            Asset::Fungible => self.transfer_from(custody, holder, custody, amount),
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
            Asset::Fungible => self.transfer(custody, holder, amount),
            other => Err(TransferError::UnsupportedAsset(other)),
        }
    }

    fn balance_of(&self, holder: &Holder, asset: Asset) -> Amount {
        match asset {
            Asset::Fungible => FungibleToken::balance_of(self, holder),
            Asset::Token(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::ONE_TOKEN;
    use crate::types::TokenId;

    const OWNER: Holder = Holder::new([1; 20]);
    const ALICE: Holder = Holder::new([2; 20]);
    const BOB: Holder = Holder::new([3; 20]);

    #[test]
    fn deploy_mints_initial_supply_to_deployer() {
        let token = FungibleToken::deploy(OWNER).expect("deploy");
        assert_eq!(token.total_supply(), INITIAL_SUPPLY);
        assert_eq!(token.balance_of(&OWNER), INITIAL_SUPPLY);
        assert_eq!(token.name(), "ERC20 MockToken");
        assert_eq!(token.symbol(), "MockToken");
        assert_eq!(token.decimals(), 18);
        assert_eq!(token.owner(), OWNER);
    }

    #[test]
    fn deploy_rejects_zero_deployer() {
        assert!(matches!(
            FungibleToken::deploy(Holder::ZERO),
            Err(LedgerError::InvalidHolder(_))
        ));
    }

    #[test]
    fn owner_mints_to_any_account() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        let own_address = token.address();

        token.mint(&OWNER, &ALICE, 100).expect("mint");
        token.mint(&OWNER, &own_address, 5 * ONE_TOKEN).expect("mint to self");

        assert_eq!(token.balance_of(&ALICE), 100);
        assert_eq!(token.balance_of(&own_address), 5 * ONE_TOKEN);
        assert_eq!(token.total_supply(), INITIAL_SUPPLY + 100 + 5 * ONE_TOKEN);
    }

    #[test]
    fn non_owner_cannot_mint() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        let before = token.clone();

        let result = token.mint(&ALICE, &ALICE, 100);
        assert_eq!(result, Err(LedgerError::Unauthorized { caller: ALICE }));
        assert_eq!(token, before);
    }

    #[test]
    fn mint_overflow_leaves_state_unchanged() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        let before = token.clone();

        assert_eq!(
            token.mint(&OWNER, &ALICE, Amount::MAX),
            Err(LedgerError::Overflow)
        );
        assert_eq!(token, before);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        token.mint(&OWNER, &ALICE, 100).expect("mint");
        token.approve(&ALICE, &BOB, 60).expect("approve");

        token.transfer_from(&BOB, &ALICE, &BOB, 40).expect("transfer");
        assert_eq!(token.balance_of(&ALICE), 60);
        assert_eq!(token.balance_of(&BOB), 40);
        assert_eq!(token.allowance(&ALICE, &BOB), 20);

        let err = token.transfer_from(&BOB, &ALICE, &BOB, 30);
        assert_eq!(
            err,
            Err(TransferError::InsufficientAllowance { have: 20, need: 30 })
        );
    }

    #[test]
    fn unlimited_allowance_is_not_consumed() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        token.approve(&OWNER, &BOB, Amount::MAX).expect("approve");
        token.transfer_from(&BOB, &OWNER, &ALICE, 10).expect("transfer");
        assert_eq!(token.allowance(&OWNER, &BOB), Amount::MAX);
    }

    #[test]
    fn transfer_checks_balance_first() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        token.mint(&OWNER, &ALICE, 10).expect("mint");

        assert_eq!(
            token.transfer(&ALICE, &BOB, 11),
            Err(TransferError::InsufficientBalance { have: 10, need: 11 })
        );
        assert_eq!(
            token.transfer(&ALICE, &Holder::ZERO, 1),
            Err(TransferError::InvalidRecipient)
        );
        assert_eq!(token.balance_of(&ALICE), 10);
    }

    #[test]
    fn adapter_rejects_token_positions() {
        let mut token = FungibleToken::deploy(OWNER).expect("deploy");
        let custody = Holder::new([9; 20]);
        let asset = Asset::Token(TokenId(1));

        assert_eq!(
            token.transfer_in(&custody, &OWNER, asset, 1),
            Err(TransferError::UnsupportedAsset(asset))
        );
        assert_eq!(AssetAdapter::balance_of(&token, &OWNER, asset), 0);
    }
}

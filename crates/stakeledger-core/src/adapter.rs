//! # Asset Adapter
//!
//! The capability the ledger needs from an external asset: move value into
//! custody, move it back out, and read a balance.
//!
//! The ledger is written once against this trait and holds one adapter per
//! asset class. An adapter only ever sees the custody account and the holder
//! it is asked to move value for; it gets no handle back into the ledger, so
//! a transfer cannot re-enter a ledger operation.

use crate::types::{Amount, Asset, AssetClass, Holder, TransferError};

/// External asset collaborator, one per asset class.
pub trait AssetAdapter: Send + Sync {
    /// The asset class this adapter moves.
    fn class(&self) -> AssetClass;

    /// The adapter's own account identifier.
    fn address(&self) -> Holder;

    /// Pull `amount` of `asset` from `holder` into `custody`.
    ///
    /// Fails without moving anything if the holder's balance, allowance or
    /// operator approval does not cover the movement.
    fn transfer_in(
        &mut self,
        custody: &Holder,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Push `amount` of `asset` from `custody` back to `holder`.
    fn transfer_out(
        &mut self,
        custody: &Holder,
        holder: &Holder,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Read-only balance query. Assets of another class report zero.
    fn balance_of(&self, holder: &Holder, asset: Asset) -> Amount;
}

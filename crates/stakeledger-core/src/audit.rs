//! # Custody Audit
//!
//! Compares what the ledger says it holds with what the custody account
//! actually holds at each adapter.
//!
//! The ledger only records what it pulled in, so the custody balance may
//! exceed the recorded stakes (someone minted or sent value to custody
//! directly). The reverse is a shortfall.

use crate::adapter::AssetAdapter;
use crate::ledger::StakeLedger;
use crate::types::{Amount, Asset, Holder, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audit line for one position key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAudit {
    pub asset: Asset,
    /// Sum of every holder's stake in this asset.
    pub staked: Amount,
    /// Balance of the custody account at the adapter.
    pub custody_balance: Amount,
}

impl AssetAudit {
    /// Custody covers every recorded stake.
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.staked <= self.custody_balance
    }

    /// Custody balance beyond recorded stakes.
    #[must_use]
    pub fn surplus(&self) -> Amount {
        self.custody_balance.saturating_sub(self.staked)
    }

    /// Recorded stakes the custody balance does not cover.
    #[must_use]
    pub fn shortfall(&self) -> Amount {
        self.staked.saturating_sub(self.custody_balance)
    }
}

/// Result of a custody audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub custody: Holder,
    /// The fungible line first, then one line per identifier with stake.
    pub assets: Vec<AssetAudit>,
}

impl AuditReport {
    /// True iff no asset is under-collateralised.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.assets.iter().all(AssetAudit::is_covered)
    }

    /// Lines where custody falls short.
    pub fn shortfalls(&self) -> impl Iterator<Item = &AssetAudit> {
        self.assets.iter().filter(|line| !line.is_covered())
    }
}

/// Audit `ledger` against its adapters.
pub fn audit<F: AssetAdapter, M: AssetAdapter>(
    ledger: &StakeLedger<F, M>,
) -> Result<AuditReport, LedgerError> {
    let snapshot = ledger.snapshot()?;

    let mut staked: BTreeMap<Asset, Amount> = BTreeMap::new();
    staked.insert(Asset::Fungible, 0);
    for position in &snapshot.positions {
        let total = staked.entry(position.asset).or_insert(0);
        *total = total
            .checked_add(position.amount)
            .ok_or(LedgerError::Overflow)?;
    }

    let custody = ledger.custody();
    let assets: Vec<AssetAudit> = staked
        .into_iter()
        .map(|(asset, staked)| AssetAudit {
            asset,
            staked,
            custody_balance: ledger.external_balance(&custody, asset),
        })
        .collect();

    let report = AuditReport { custody, assets };
    if report.is_consistent() {
        tracing::debug!(lines = report.assets.len(), "custody audit consistent");
    } else {
        for line in report.shortfalls() {
            tracing::warn!(
                event = "audit_shortfall",
                asset = %line.asset,
                staked = %line.staked,
                custody_balance = %line.custody_balance,
                "custody balance does not cover recorded stakes"
            );
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Deployment;
    use crate::store::StorageBackend;
    use crate::types::TokenId;

    const OWNER: Holder = Holder::new([1; 20]);

    fn deployment() -> Deployment {
        let mut ledger = Deployment::deploy(StorageBackend::default(), OWNER).expect("deploy");
        ledger.approve_custody(&OWNER, 1_000).expect("approve");
        ledger.approve_custody_all(&OWNER, true).expect("approve all");
        ledger
    }

    #[test]
    fn fresh_ledger_is_consistent() {
        let report = audit(&deployment()).expect("audit");
        assert!(report.is_consistent());
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].asset, Asset::Fungible);
        assert_eq!(report.assets[0].staked, 0);
    }

    #[test]
    fn stakes_are_covered() {
        let mut ledger = deployment();
        ledger.stake_fungible(&OWNER, 100).expect("stake");
        ledger.stake_by_id(&OWNER, TokenId(2), 1).expect("stake");

        let report = audit(&ledger).expect("audit");
        assert!(report.is_consistent());
        assert_eq!(report.assets.len(), 2);
        assert_eq!(report.assets[1].asset, Asset::Token(TokenId(2)));
        assert_eq!(report.assets[1].custody_balance, 1);
    }

    #[test]
    fn direct_mint_to_custody_is_surplus() {
        let mut ledger = deployment();
        let custody = ledger.custody();
        ledger.mint_fungible(&OWNER, &custody, 5).expect("mint");

        let report = audit(&ledger).expect("audit");
        assert!(report.is_consistent());
        assert_eq!(report.assets[0].surplus(), 5);
    }

    #[test]
    fn drained_custody_is_a_shortfall() {
        let mut ledger = deployment();
        ledger.stake_fungible(&OWNER, 100).expect("stake");
        let custody = ledger.custody();
        ledger
            .fungible_mut()
            .transfer(&custody, &OWNER, 40)
            .expect("drain");

        let report = audit(&ledger).expect("audit");
        assert!(!report.is_consistent());
        assert_eq!(report.shortfalls().count(), 1);
        assert_eq!(report.assets[0].shortfall(), 40);
    }
}

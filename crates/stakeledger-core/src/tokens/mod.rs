//! # Test-Asset Fixtures
//!
//! In-process stand-ins for the two external asset ledgers. Each one mints
//! its initial supply to the deployer, restricts further minting to that
//! owner, and implements [`AssetAdapter`](crate::adapter::AssetAdapter) so a
//! `StakeLedger` can take custody of it.

pub mod fungible;
pub mod multi;

pub use fungible::FungibleToken;
pub use multi::MultiToken;

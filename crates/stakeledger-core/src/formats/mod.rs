//! # Formats Module
//!
//! Binary framing and the ledger snapshot format.
//!
//! File I/O operations are in the app layer.

pub mod persistence;
pub mod snapshot;

pub use persistence::{PersistenceHeader, decode_framed, encode_framed};
pub use snapshot::{
    LedgerSnapshot, StakePosition, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes,
};

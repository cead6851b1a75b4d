//! # stakeledger
//!
//! CLI and HTTP surface over [`stakeledger_core`].
//!
//! The binary in `main.rs` only initialises logging and dispatches to
//! [`cli::execute`]; everything else lives here so integration tests can
//! drive the router and commands directly.

pub mod api;
pub mod cli;
pub mod config;

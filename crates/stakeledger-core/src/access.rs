//! # Access Gate
//!
//! Single-owner authorization for administrative operations.
//!
//! The owner is fixed when the gate is built; there is no transfer of
//! ownership. Callers check the gate before touching any state, so a
//! rejected call leaves everything as it was.

use crate::types::{Holder, LedgerError};
use serde::{Deserialize, Serialize};

/// Holds the immutable owner identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGate {
    owner: Holder,
}

impl AccessGate {
    /// Create a gate for the given owner.
    #[must_use]
    pub const fn new(owner: Holder) -> Self {
        Self { owner }
    }

    /// The owner identity.
    #[must_use]
    pub const fn owner(&self) -> Holder {
        self.owner
    }

    /// Check whether `caller` is the owner.
    #[must_use]
    pub fn is_owner(&self, caller: &Holder) -> bool {
        *caller == self.owner
    }

    /// Fail with `Unauthorized` unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Holder) -> Result<(), LedgerError> {
        if self.is_owner(caller) {
            return Ok(());
        }
        tracing::warn!(
            event = "auth_failure",
            caller = %caller,
            "administrative call rejected: caller is not the owner"
        );
        Err(LedgerError::Unauthorized { caller: *caller })
    }
}

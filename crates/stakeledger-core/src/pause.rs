//! # Pause Gate
//!
//! Two-state machine gating withdrawals.
//!
//! | From | `pause` | `unpause` |
//! |------|---------|-----------|
//! | Active | Paused | Active (no-op) |
//! | Paused | Paused (no-op) | Active |
//!
//! Both transitions go through the [`AccessGate`]; an unauthorized call is
//! rejected before the state is read. Deposits never consult this gate.

use crate::access::AccessGate;
use crate::types::{Holder, LedgerError, PauseState};

/// The withdrawal gate. Starts `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PauseGate {
    state: PauseState,
}

impl PauseGate {
    /// Create a gate in the initial `Paused` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a gate from persisted state.
    #[must_use]
    pub const fn with_state(state: PauseState) -> Self {
        Self { state }
    }

    #[must_use]
    pub const fn state(&self) -> PauseState {
        self.state
    }

    /// Side-effect-free query.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    /// Close withdrawals. Returns `true` if the state changed.
    pub fn pause(&mut self, access: &AccessGate, caller: &Holder) -> Result<bool, LedgerError> {
        self.transition(access, caller, PauseState::Paused)
    }

    /// Open withdrawals. Returns `true` if the state changed.
    pub fn unpause(&mut self, access: &AccessGate, caller: &Holder) -> Result<bool, LedgerError> {
        self.transition(access, caller, PauseState::Active)
    }

    fn transition(
        &mut self,
        access: &AccessGate,
        caller: &Holder,
        target: PauseState,
    ) -> Result<bool, LedgerError> {
        access.require_owner(caller)?;
        if self.state == target {
            return Ok(false);
        }
        self.state = target;
        Ok(true)
    }
}

//! Process lifecycle state machine.
//!
//! `Starting -> Running -> ShuttingDown -> Stopped`, forward only. The single
//! shortcut is `Starting -> Stopped`, taken when the sidecar fails to come up.

use std::fmt;

use crate::error::{PushmeterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Starting, Running) | (Starting, Stopped) | (Running, ShuttingDown) | (ShuttingDown, Stopped)
        )
    }

    /// Validate and return the next state.
    pub fn advance(self, next: LifecycleState) -> Result<LifecycleState> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(PushmeterError::InvalidTransition { from: self, to: next })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Stopped
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Device session lifecycle.
//!
//! Both device sessions move through the same four states:
//!
//! - `Disconnected` → `Opening` (open requested)
//! - `Opening` → `Ready` (every open step succeeded)
//! - `Opening` → `Disconnected` (a step failed, teardown ran)
//! - `Ready` → `Closing` → `Disconnected`
//!
//! Reads and configuration writes are only legal in `Ready`.
//!
//! # Examples
//!
//! ```
//! use netbox_hardware::session::{SessionState, SessionStateMachine};
//!
//! let mut machine = SessionStateMachine::new();
//! machine.transition_to(SessionState::Opening).unwrap();
//! machine.transition_to(SessionState::Ready).unwrap();
//! assert!(machine.current_state().is_ready());
//! assert!(machine.transition_to(SessionState::Opening).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{HardwareError, Result};

/// Maximum number of transitions kept for diagnostics.
///
/// A full connect/disconnect cycle records four transitions.
const MAX_HISTORY_SIZE: usize = 32;

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No driver handle is held.
    Disconnected,
    /// The open sequence is running.
    Opening,
    /// The device is streaming and may be read.
    Ready,
    /// Teardown is running.
    Closing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Opening => "Opening",
            Self::Ready => "Ready",
            Self::Closing => "Closing",
        };
        f.write_str(name)
    }
}

impl SessionState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use netbox_hardware::session::SessionState;
    ///
    /// assert!(SessionState::Opening.can_transition_to(&SessionState::Disconnected));
    /// assert!(!SessionState::Disconnected.can_transition_to(&SessionState::Ready));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Disconnected, SessionState::Opening)
                | (
                    SessionState::Opening,
                    SessionState::Ready | SessionState::Disconnected
                )
                | (SessionState::Ready, SessionState::Closing)
                | (SessionState::Closing, SessionState::Disconnected)
        )
    }

    /// Returns `true` in the `Ready` state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

/// A recorded state change.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: SessionState,
    /// The state transitioned to.
    pub to: SessionState,
    /// When the transition occurred.
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Time elapsed since the transition.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Guards the lifecycle of one device session.
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl SessionStateMachine {
    /// Create a machine in the `Disconnected` state.
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Disconnected,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Current state.
    #[must_use]
    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    /// Time spent in the current state.
    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state`, rejecting transitions the lifecycle does not allow.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidTransition`] if the move is illegal.
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<()> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(HardwareError::InvalidTransition {
                from: self.current_state,
                to: new_state,
            });
        }

        tracing::trace!(from = %self.current_state, to = %new_state, "session transition");

        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history
            .push_back(StateTransition::new(self.current_state, new_state));
        self.current_state = new_state;
        self.state_entered_at = Instant::now();
        Ok(())
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

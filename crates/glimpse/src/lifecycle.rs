//! Session lifecycle: a finite state enum and its transition table.
//!
//! ```text
//! Idle --Begin--> Starting --Activate--> Active <--Pause/Resume--> Paused
//!                 Starting --Abandon---> Idle
//! Idle|Starting|Active|Paused --Fault--> Error
//! any non-terminal --Terminate--> Terminated
//! ```
//!
//! `Error` only leads to `Terminated`. `Terminated` leads nowhere.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Constructed, not started
    #[default]
    Idle,
    /// Start requested, waiting for activation (presentation in progress)
    Starting,
    /// Frames flow and requests may dispatch
    Active,
    /// Frame intake halted
    Paused,
    /// Unrecoverable configuration fault
    Error,
    /// Final; all resources released
    Terminated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Error => "error",
            SessionState::Terminated => "terminated",
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }

    /// Look up the transition table. `None` means the event is illegal in
    /// this state.
    pub fn apply(self, transition: Transition) -> Option<SessionState> {
        use SessionState::*;
        use Transition::*;

        match (self, transition) {
            (Idle, Begin) => Some(Starting),
            (Starting, Activate) => Some(Active),
            (Starting, Abandon) => Some(Idle),
            (Active, Pause) => Some(Paused),
            (Paused, Pause) => Some(Paused),
            (Paused, Resume) => Some(Active),
            (Idle | Starting | Active | Paused, Fault) => Some(Error),
            (Idle | Starting | Active | Paused | Error, Terminate) => Some(Terminated),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Begin,
    Activate,
    Abandon,
    Pause,
    Resume,
    Fault,
    Terminate,
}

//! Frame gate: decides which camera frames become recognition requests.
//!
//! A frame is admitted only when the session is active in continuous mode,
//! nothing is in flight, and at least the debounce interval has passed since
//! the previously admitted frame. Everything else is dropped silently; a
//! dropped frame is a normal outcome, not a fault.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::lifecycle::SessionState;
use crate::types::{Frame, RecognitionMode, RequestId};

/// Why a frame was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Session is not `Active`
    NotActive,
    /// Session is in manual mode
    ContinuousDisabled,
    /// A continuous request is already in flight
    RequestInFlight,
    /// A manual request is in flight; manual always wins
    ManualInFlight,
    /// Too soon after the last admitted frame
    Debounced,
    /// Sequence number did not advance
    OutOfOrder,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::NotActive => "not_active",
            DropReason::ContinuousDisabled => "continuous_disabled",
            DropReason::RequestInFlight => "request_in_flight",
            DropReason::ManualInFlight => "manual_in_flight",
            DropReason::Debounced => "debounced",
            DropReason::OutOfOrder => "out_of_order",
        };
        f.write_str(s)
    }
}

/// Outcome of offering a frame to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(RequestId),
    Dropped(DropReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Admission::Admitted(id) => Some(*id),
            Admission::Dropped(_) => None,
        }
    }
}

/// Session facts the gate needs, read under the session lock.
#[derive(Debug, Clone, Copy)]
pub struct GateContext {
    pub state: SessionState,
    pub mode: RecognitionMode,
    pub in_flight: Option<RecognitionMode>,
}

#[derive(Debug, Clone)]
pub struct FrameGate {
    min_interval: Duration,
    last_admitted: Option<Duration>,
    last_sequence: Option<u64>,
}

impl FrameGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
            last_sequence: None,
        }
    }

    /// Decide admission for `frame`. On `Ok` the frame is recorded as the
    /// latest admitted one and the caller must dispatch it.
    pub fn admit(&mut self, frame: &Frame, ctx: GateContext) -> Result<(), DropReason> {
        if let Some(last) = self.last_sequence {
            if frame.sequence <= last {
                return Err(DropReason::OutOfOrder);
            }
        }
        self.last_sequence = Some(frame.sequence);

        if ctx.state != SessionState::Active {
            return Err(DropReason::NotActive);
        }
        if ctx.mode != RecognitionMode::Continuous {
            return Err(DropReason::ContinuousDisabled);
        }
        match ctx.in_flight {
            Some(RecognitionMode::Manual) => return Err(DropReason::ManualInFlight),
            Some(RecognitionMode::Continuous) => return Err(DropReason::RequestInFlight),
            None => {}
        }
        if let Some(last) = self.last_admitted {
            if frame.timestamp.saturating_sub(last) < self.min_interval {
                return Err(DropReason::Debounced);
            }
        }

        self.last_admitted = Some(frame.timestamp);
        Ok(())
    }

    /// Forget admission history (used when the session releases its frames).
    pub fn reset(&mut self) {
        self.last_admitted = None;
        self.last_sequence = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> GateContext {
        GateContext {
            state: SessionState::Active,
            mode: RecognitionMode::Continuous,
            in_flight: None,
        }
    }

    fn frame(sequence: u64, ms: u64) -> Frame {
        Frame::new(sequence, Duration::from_millis(ms), Vec::new())
    }

    #[test]
    fn debounce_scenario() {
        let mut gate = FrameGate::new(Duration::from_millis(500));
        assert_eq!(gate.admit(&frame(1, 0), active()), Ok(()));
        assert_eq!(gate.admit(&frame(2, 200), active()), Err(DropReason::Debounced));
        assert_eq!(gate.admit(&frame(3, 600), active()), Ok(()));
    }

    #[test]
    fn drops_when_not_active() {
        let mut gate = FrameGate::new(Duration::ZERO);
        for state in [
            SessionState::Idle,
            SessionState::Starting,
            SessionState::Paused,
            SessionState::Error,
        ] {
            let ctx = GateContext { state, ..active() };
            assert_eq!(gate.admit(&frame(state as u64 + 1, 0), ctx), Err(DropReason::NotActive));
        }
    }

    #[test]
    fn in_flight_requests_block_frames() {
        let mut gate = FrameGate::new(Duration::ZERO);
        let continuous = GateContext {
            in_flight: Some(RecognitionMode::Continuous),
            ..active()
        };
        let manual = GateContext {
            in_flight: Some(RecognitionMode::Manual),
            ..active()
        };
        assert_eq!(gate.admit(&frame(1, 0), continuous), Err(DropReason::RequestInFlight));
        assert_eq!(gate.admit(&frame(2, 10), manual), Err(DropReason::ManualInFlight));
    }

    #[test]
    fn manual_mode_disables_frames() {
        let mut gate = FrameGate::new(Duration::ZERO);
        let ctx = GateContext {
            mode: RecognitionMode::Manual,
            ..active()
        };
        assert_eq!(gate.admit(&frame(1, 0), ctx), Err(DropReason::ContinuousDisabled));
    }

    #[test]
    fn dropped_frames_do_not_reset_debounce() {
        let mut gate = FrameGate::new(Duration::from_millis(500));
        assert!(gate.admit(&frame(1, 0), active()).is_ok());
        assert!(gate.admit(&frame(2, 400), active()).is_err());
        // measured from the admitted frame at 0, not the dropped one at 400
        assert!(gate.admit(&frame(3, 500), active()).is_ok());
    }

    #[test]
    fn stale_sequence_is_dropped() {
        let mut gate = FrameGate::new(Duration::ZERO);
        assert!(gate.admit(&frame(5, 0), active()).is_ok());
        assert_eq!(gate.admit(&frame(5, 100), active()), Err(DropReason::OutOfOrder));
        assert_eq!(gate.admit(&frame(4, 200), active()), Err(DropReason::OutOfOrder));

        gate.reset();
        assert!(gate.admit(&frame(1, 0), active()).is_ok());
    }
}

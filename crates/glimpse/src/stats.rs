//! Per-session counters.

use serde::Serialize;

use crate::gate::DropReason;
use crate::types::RecognitionResult;

/// Counters accumulated over the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Frames offered through `submit_frame`
    pub frames_seen: u64,
    /// Frames that became requests
    pub frames_admitted: u64,
    /// Frames dropped by the gate, any reason
    pub frames_dropped: u64,
    /// Requests dispatched, continuous and manual
    pub requests_dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Extra attempts made after transient faults
    pub retries: u64,
    /// Responses that arrived after their request was already terminal
    pub late_discarded: u64,
}

impl SessionStats {
    pub(crate) fn record_admission(&mut self, outcome: Result<(), DropReason>) {
        self.frames_seen += 1;
        match outcome {
            Ok(()) => self.frames_admitted += 1,
            Err(_) => self.frames_dropped += 1,
        }
    }

    pub(crate) fn record_outcome(&mut self, result: &RecognitionResult) {
        match result {
            RecognitionResult::Success { .. } => self.succeeded += 1,
            RecognitionResult::Failure { .. } => self.failed += 1,
            RecognitionResult::Cancelled => self.cancelled += 1,
        }
    }

    /// Requests that reached a terminal outcome.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }

    /// Requests dispatched but not yet terminal (0 or 1).
    pub fn in_flight(&self) -> u64 {
        self.requests_dispatched.saturating_sub(self.completed())
    }
}

//! Engine contract errors, returned synchronously to the caller.
//!
//! Transport faults never show up here: the dispatcher resolves them into a
//! [`RecognitionResult`](crate::RecognitionResult) delivered to the observer.

use thiserror::Error;

use crate::lifecycle::SessionState;
use crate::types::RequestId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Operation is not legal in the current state. No state change occurred.
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The session reached `Terminated`; nothing further is performed.
    #[error("session has been terminated")]
    Terminated,

    /// The host refused or failed the presentation handshake.
    #[error("presentation failed: {0}")]
    Presentation(String),

    /// Unrecoverable configuration fault (e.g. missing credentials).
    #[error("invalid session configuration: {0}")]
    Configuration(String),

    /// A manual request is still in flight and manual requests do not
    /// preempt each other.
    #[error("manual request {0} is still in flight")]
    ManualInFlight(RequestId),

    /// The session was created outside a tokio runtime.
    #[error("no tokio runtime available to drive the session")]
    NoRuntime,
}

impl SessionError {
    pub(crate) fn invalid(operation: &'static str, state: SessionState) -> Self {
        SessionError::InvalidState { operation, state }
    }
}

//! glimpse: a continuous visual-recognition session engine.
//!
//! A [`RecognitionSession`] turns a stream of camera [`Frame`]s into
//! recognition requests against a remote service and routes exactly one
//! terminal [`RecognitionResult`] per request back to a
//! [`RecognitionObserver`].
//!
//! ```text
//! submit_frame ─► FrameGate ─► dispatcher task ─► transport
//!                                   │
//!                                   ▼
//!                       ResultRouter ─► observer.on_result
//! ```
//!
//! - At most one request is in flight per session, and at most one network
//!   exchange runs at any instant.
//! - Manual submissions preempt continuous requests; frames never preempt
//!   a manual request.
//! - `Network` and `Timeout` faults are retried within a bounded
//!   [`RetryPolicy`]; entitlement faults are reported immediately.
//! - Results reach the observer in the order their requests finished.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use glimpse::{
//!     EngineConfig, Frame, LoopbackTransport, RecognitionObserver, RecognitionResult,
//!     RecognitionSession, RequestId,
//! };
//!
//! struct Print;
//!
//! impl RecognitionObserver for Print {
//!     fn on_result(&self, id: RequestId, result: RecognitionResult) {
//!         println!("{id}: {result:?}");
//!     }
//! }
//!
//! # async fn run() -> Result<(), glimpse::SessionError> {
//! let observer = Arc::new(Print);
//! let session = RecognitionSession::new(
//!     EngineConfig::new("acme-retail"),
//!     Arc::new(LoopbackTransport::new(Duration::from_millis(50))),
//! )?
//! .with_observer(&observer);
//!
//! session.start()?;
//! session.submit_frame(Frame::new(1, Duration::ZERO, vec![0u8; 1024]))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod dispatcher;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod presentation;
pub mod retry;
pub mod router;
pub mod session;
pub mod stats;
pub mod transport;
pub mod types;

pub use config::EngineConfig;
pub use error::SessionError;
pub use gate::{Admission, DropReason, FrameGate, GateContext};
pub use lifecycle::{SessionState, Transition};
pub use presentation::{
    AttachmentHandle, HostError, PresentationController, PresentationHost, TransitionDirection,
    TransitionStyle,
};
pub use glimpseconf::BackoffKind;
pub use retry::RetryPolicy;
pub use router::RecognitionObserver;
pub use session::{InFlight, RecognitionSession, SessionControl, SessionSnapshot};
pub use stats::SessionStats;
pub use transport::{LoopbackTransport, RecognitionTransport, TransportError};
pub use types::{
    FailureKind, Frame, OptionValue, Options, Payload, RecognitionMode, RecognitionRequest,
    RecognitionResult, RequestId, RequestSource, SessionId,
};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

/// Re-export of the configuration crate.
pub use glimpseconf;

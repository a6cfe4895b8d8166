//! Data model shared by the gate, dispatcher, router and session.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use glimpseconf::OptionValue;

/// Opaque pass-through options forwarded with each request.
pub type Options = glimpseconf::OptionsTable;

/// Opaque recognition payload returned by the service.
pub type Payload = serde_json::Value;

/// Unique identifier for a recognition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

/// Request identifier, unique and increasing within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Whether recognition is driven by the frame stream or by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    Continuous,
    Manual,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionMode::Continuous => "continuous",
            RecognitionMode::Manual => "manual",
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured camera frame.
///
/// `timestamp` comes from the frame source's monotonic clock and is only
/// compared against other frames of the same source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub timestamp: Duration,
    pub image: Bytes,
}

impl Frame {
    pub fn new(sequence: u64, timestamp: Duration, image: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            timestamp,
            image: image.into(),
        }
    }
}

/// What a request carries to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// A frame admitted by the gate
    Frame(Frame),
    /// A still image supplied by the caller
    Image(Bytes),
}

impl RequestSource {
    pub fn image(&self) -> &Bytes {
        match self {
            RequestSource::Frame(frame) => &frame.image,
            RequestSource::Image(image) => image,
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self {
            RequestSource::Frame(frame) => Some(frame.sequence),
            RequestSource::Image(_) => None,
        }
    }
}

/// A recognition request as handed to the transport.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub id: RequestId,
    pub session_id: SessionId,
    pub client_id: Arc<str>,
    pub source: RequestSource,
    pub mode: RecognitionMode,
    /// 1-based attempt counter
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
    /// Immutable snapshot taken at dispatch time
    pub options: Arc<Options>,
}

/// Classified reason a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport-level fault (connection refused, reset, 5xx)
    Network,
    /// No response within the per-attempt deadline
    Timeout,
    /// Credentials rejected
    Unauthorized,
    /// Requested capability not entitled for these credentials
    UnsupportedFeature,
    /// Service refused the request or answered with something unusable
    Rejected,
}

impl FailureKind {
    /// Transient faults are retried, entitlement faults never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::UnsupportedFeature => "unsupported_feature",
            FailureKind::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one request. Exactly one is delivered per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecognitionResult {
    Success { payload: Payload },
    Failure { kind: FailureKind, message: String },
    Cancelled,
}

impl RecognitionResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        RecognitionResult::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecognitionResult::Success { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RecognitionResult::Cancelled)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RecognitionResult::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(FailureKind::Network.is_retryable());
        assert!(FailureKind::Timeout.is_retryable());
        assert!(!FailureKind::Unauthorized.is_retryable());
        assert!(!FailureKind::UnsupportedFeature.is_retryable());
        assert!(!FailureKind::Rejected.is_retryable());
    }

    #[test]
    fn result_serializes_with_outcome_tag() {
        let value = serde_json::to_value(RecognitionResult::failure(
            FailureKind::UnsupportedFeature,
            "image search not enabled",
        ))
        .unwrap();
        assert_eq!(value["outcome"], "failure");
        assert_eq!(value["kind"], "unsupported_feature");

        let cancelled = serde_json::to_value(RecognitionResult::Cancelled).unwrap();
        assert_eq!(cancelled, serde_json::json!({"outcome": "cancelled"}));
    }

    #[test]
    fn request_source_exposes_image() {
        let frame = Frame::new(7, Duration::from_millis(40), vec![1u8, 2, 3]);
        let source = RequestSource::Frame(frame);
        assert_eq!(source.sequence(), Some(7));
        assert_eq!(source.image().as_ref(), &[1, 2, 3]);

        let manual = RequestSource::Image(Bytes::from_static(b"jpeg"));
        assert_eq!(manual.sequence(), None);
    }
}

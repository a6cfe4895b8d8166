//! Recognition service transports.
//!
//! The engine only needs `recognize(request) -> payload | fault`. Aborting an
//! exchange is done by dropping its future; transports that cannot stop
//! mid-flight report `abortable() == false`.

pub mod loopback;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{FailureKind, Payload, RecognitionRequest};

pub use loopback::LoopbackTransport;

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Faults a transport can report for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransportError::Network(_) => FailureKind::Network,
            TransportError::Timeout => FailureKind::Timeout,
            TransportError::Unauthorized(_) => FailureKind::Unauthorized,
            TransportError::UnsupportedFeature(_) => FailureKind::UnsupportedFeature,
            TransportError::Rejected(_) => FailureKind::Rejected,
        }
    }
}

/// One request/response exchange with the recognition service.
///
/// Called at most once at a time per session. Implementations must not
/// retry on their own; the dispatcher owns retry and timeout policy.
#[async_trait]
pub trait RecognitionTransport: Send + Sync + 'static {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Payload, TransportError>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "transport"
    }

    /// Whether dropping an in-progress `recognize` future aborts the
    /// exchange. When false, a cancelled exchange is left to finish and its
    /// response is discarded.
    fn abortable(&self) -> bool {
        true
    }
}

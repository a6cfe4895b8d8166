//! In-process transport that answers every request after a fixed latency.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::{RecognitionTransport, TransportError};
use crate::types::{Payload, RecognitionRequest};

#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    latency: Duration,
}

impl LoopbackTransport {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl RecognitionTransport for LoopbackTransport {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Payload, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        Ok(json!({
            "request_id": request.id.0,
            "session_id": request.session_id.to_string(),
            "mode": request.mode,
            "attempt": request.attempt,
            "sequence": request.source.sequence(),
            "image_bytes": request.source.image().len(),
            "options": &*request.options,
        }))
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Frame, Options, RecognitionMode, RequestId, RequestSource, SessionId,
    };
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn echoes_request_after_latency() {
        let mut options = Options::new();
        options.insert("storeID".into(), "1234".into());
        let request = RecognitionRequest {
            id: RequestId(3),
            session_id: SessionId::generate(),
            client_id: Arc::from("acme"),
            source: RequestSource::Frame(Frame::new(9, Duration::ZERO, vec![0u8; 16])),
            mode: RecognitionMode::Continuous,
            attempt: 1,
            submitted_at: chrono::Utc::now(),
            options: Arc::new(options),
        };

        let transport = LoopbackTransport::new(Duration::from_millis(100));
        let started = tokio::time::Instant::now();
        let payload = transport.recognize(&request).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(payload["request_id"], 3);
        assert_eq!(payload["mode"], "continuous");
        assert_eq!(payload["sequence"], 9);
        assert_eq!(payload["image_bytes"], 16);
        assert_eq!(payload["options"]["storeID"], "1234");
    }
}

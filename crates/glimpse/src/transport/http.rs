//! HTTP transport: one JSON POST per attempt to `<endpoint>/recognize`.
//!
//! Status mapping:
//! - 2xx: success, body is the payload
//! - 401, 403: `Unauthorized`
//! - 501, or any error body with code `unsupported_feature`: `UnsupportedFeature`
//! - 408, 504: `Timeout`
//! - other 5xx, connect/reset errors: `Network`
//! - other 4xx, undecodable bodies: `Rejected`

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::{RecognitionTransport, TransportError};
use crate::types::{Options, Payload, RecognitionMode, RecognitionRequest};

/// Wire body sent for each attempt.
#[derive(Debug, Serialize)]
struct RecognizeBody<'a> {
    request_id: u64,
    session_id: String,
    client_id: &'a str,
    mode: RecognitionMode,
    attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    options: &'a Options,
    image: String,
}

pub struct HttpTransport {
    url: String,
    client: Client,
}

impl HttpTransport {
    /// Create a transport for the service at `endpoint`
    /// (e.g. "http://127.0.0.1:8090").
    pub fn new(endpoint: &str) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_client(endpoint: &str, client: Client) -> Self {
        Self {
            url: format!("{}/recognize", endpoint.trim_end_matches('/')),
            client,
        }
    }
}

#[async_trait]
impl RecognitionTransport for HttpTransport {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<Payload, TransportError> {
        let body = RecognizeBody {
            request_id: request.id.0,
            session_id: request.session_id.to_string(),
            client_id: &request.client_id,
            mode: request.mode,
            attempt: request.attempt,
            sequence: request.source.sequence(),
            options: &request.options,
            image: base64::engine::general_purpose::STANDARD.encode(request.source.image()),
        };

        let response = self
            .client
            .post(&self.url)
            .header("X-Glimpse-Client", &*request.client_id)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read body: {}", e)))?;

        if status.is_success() {
            return serde_json::from_str::<Value>(&text)
                .map_err(|e| TransportError::Rejected(format!("undecodable payload: {}", e)));
        }

        Err(classify_status(status, &text))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Map a non-2xx response to a transport fault.
fn classify_status(status: StatusCode, body: &str) -> TransportError {
    let (code, message) = error_fields(body);
    let message = message.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if code.as_deref() == Some("unsupported_feature") || status == StatusCode::NOT_IMPLEMENTED {
        return TransportError::UnsupportedFeature(message);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => TransportError::Timeout,
        s if s.is_server_error() => TransportError::Network(message),
        _ => TransportError::Rejected(message),
    }
}

/// Pull `code`/`message` out of `{"error": {...}}` or a flat error object.
fn error_fields(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let obj = value.get("error").filter(|e| e.is_object()).unwrap_or(&value);
    let field = |name: &str| obj.get(name).and_then(Value::as_str).map(str::to_string);
    (field("code"), field("message"))
}

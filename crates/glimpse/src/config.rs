//! Engine tunables.
//!
//! Built either by hand (`EngineConfig::new(client_id)` plus `with_*`) or
//! from a loaded [`GlimpseConfig`].

use std::sync::Arc;
use std::time::Duration;

use glimpseconf::GlimpseConfig;

use crate::error::SessionError;
use crate::retry::RetryPolicy;
use crate::types::{Options, RecognitionMode};

/// Configuration for one recognition session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Client credential sent with every request
    pub client_id: Arc<str>,
    /// Initial recognition mode
    pub mode: RecognitionMode,
    /// Minimum spacing between admitted continuous frames
    pub debounce: Duration,
    /// Per-attempt deadline, measured on the runtime's monotonic clock
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Initial pass-through options
    pub options: Options,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_conf(&GlimpseConfig::default())
    }
}

impl EngineConfig {
    pub fn new(client_id: impl Into<Arc<str>>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    pub fn from_conf(conf: &GlimpseConfig) -> Self {
        let mode = if conf.engine.continuous {
            RecognitionMode::Continuous
        } else {
            RecognitionMode::Manual
        };
        Self {
            client_id: Arc::from(conf.service.client_id.as_str()),
            mode,
            debounce: Duration::from_millis(conf.engine.debounce_ms),
            request_timeout: Duration::from_millis(conf.engine.request_timeout_ms),
            retry: RetryPolicy::from_section(&conf.engine),
            options: conf.options.clone(),
        }
    }

    pub fn with_mode(mut self, mode: RecognitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the pass-through options. `None` means no options.
    pub fn with_options(mut self, options: Option<Options>) -> Self {
        self.options = options.unwrap_or_default();
        self
    }

    /// Check the configuration before the session starts.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.client_id.trim().is_empty() {
            return Err(SessionError::Configuration("client_id is empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "request_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

//! Configuration sections.
//!
//! Every field carries a serde default so a partial file (or no file at all)
//! still produces a complete configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tunables for the session engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Minimum spacing between admitted continuous frames, in milliseconds.
    pub debounce_ms: u64,

    /// Per-attempt deadline for one recognition exchange, in milliseconds.
    pub request_timeout_ms: u64,

    /// Total attempts per request, including the first one.
    pub max_attempts: u32,

    /// Backoff shape between retried attempts.
    pub backoff: BackoffKind,

    /// First retry delay, in milliseconds.
    pub backoff_base_ms: u64,

    /// Upper bound for any retry delay, in milliseconds.
    pub backoff_max_ms: u64,

    /// Start sessions in continuous mode. When false only manual
    /// submissions are recognized.
    pub continuous: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            request_timeout_ms: 10_000,
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            backoff_base_ms: 250,
            backoff_max_ms: 4_000,
            continuous: true,
        }
    }
}

/// How retry delays grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Every retry waits `backoff_base_ms`.
    Fixed,
    /// Delay doubles per retry, capped at `backoff_max_ms`.
    #[default]
    Exponential,
}

/// Where recognition requests go and who sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Base URL of the recognition service.
    pub endpoint: String,

    /// Client identifier issued by the service operator.
    pub client_id: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090".to_string(),
            client_id: String::new(),
        }
    }
}

/// Logging and trace export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// `EnvFilter` directive string.
    pub log_level: String,

    /// OTLP gRPC endpoint (host:port). Export is disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: "info,glimpse=debug".to_string(),
            otlp_endpoint: None,
        }
    }
}

/// A scalar forwarded verbatim to the recognition service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// Interpret a raw string (from an env var or CLI flag).
    ///
    /// Integers and floats are recognized, `true`/`false` become booleans,
    /// everything else stays text.
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            return OptionValue::Integer(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            if v.is_finite() {
                return OptionValue::Float(v);
            }
        }
        match raw {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => OptionValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Integer(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

/// Flat pass-through mapping sent with every request.
pub type OptionsTable = BTreeMap<String, OptionValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_value_parse() {
        assert_eq!(OptionValue::parse("1234"), OptionValue::Integer(1234));
        assert_eq!(OptionValue::parse("2.5"), OptionValue::Float(2.5));
        assert_eq!(OptionValue::parse("true"), OptionValue::Bool(true));
        assert_eq!(OptionValue::parse("CA"), OptionValue::Text("CA".into()));
        assert_eq!(OptionValue::parse("NaN"), OptionValue::Text("NaN".into()));
    }

    #[test]
    fn engine_defaults() {
        let engine = EngineSection::default();
        assert_eq!(engine.debounce_ms, 500);
        assert_eq!(engine.max_attempts, 3);
        assert_eq!(engine.backoff, BackoffKind::Exponential);
        assert!(engine.continuous);
    }
}

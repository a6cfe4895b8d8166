//! Configuration loading for glimpse.
//!
//! This crate is shared by the session engine and the CLI, so it keeps its
//! dependencies to serde, toml and directories.
//!
//! # Usage
//!
//! ```rust,no_run
//! use glimpseconf::GlimpseConfig;
//!
//! let config = GlimpseConfig::load().expect("Failed to load config");
//! println!("service: {}", config.service.endpoint);
//! println!("debounce: {}ms", config.engine.debounce_ms);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/glimpse/config.toml` (system)
//! 2. `~/.config/glimpse/config.toml` (user)
//! 3. `./glimpse.toml` (local override, replaced by an explicit path)
//! 4. Environment variables (`GLIMPSE_*`)
//!
//! # Example Config
//!
//! ```toml
//! [engine]
//! debounce_ms = 500
//! request_timeout_ms = 10000
//! max_attempts = 3
//! backoff = "exponential"
//!
//! [service]
//! endpoint = "https://recognize.example.com"
//! client_id = "acme-retail"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [options]
//! storeID = "1234"
//! state = "CA"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files, discover_config_files_with_override, ConfigSources};
pub use sections::{
    BackoffKind, EngineSection, OptionValue, OptionsTable, ServiceSection, TelemetrySection,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid merged configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(String),
}

/// Complete glimpse configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlimpseConfig {
    pub engine: EngineSection,
    pub service: ServiceSection,
    pub telemetry: TelemetrySection,

    /// Opaque pass-through options forwarded with every request.
    pub options: OptionsTable,
}

impl GlimpseConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file taking the place of
    /// `./glimpse.toml`, then apply env overrides.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::read_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged)?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Parse a single TOML document on top of compiled defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table = loader::parse_table(contents, Path::new("<inline>"))?;
        loader::from_table(table)
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))?;
        Ok(format!("# glimpse configuration\n\n{}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = GlimpseConfig::default();
        assert_eq!(config.engine.debounce_ms, 500);
        assert!(config.service.client_id.is_empty());
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_to_toml_round_trips_sections() {
        let mut config = GlimpseConfig::default();
        config.service.client_id = "acme".into();
        config.options.insert("storeID".into(), OptionValue::Text("1234".into()));

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[engine]"));
        assert!(rendered.contains("[service]"));
        assert!(rendered.contains("storeID"));

        let reparsed = GlimpseConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[engine]\ndebounce_ms = 250\n\n[service]\nclient_id = \"from-file\"\n",
        )
        .unwrap();

        let (config, sources) = GlimpseConfig::load_with_sources_from(Some(&path)).unwrap();
        assert!(sources.files.contains(&path));
        // env vars may override these in a developer shell; only assert when absent
        if std::env::var("GLIMPSE_DEBOUNCE_MS").is_err() {
            assert_eq!(config.engine.debounce_ms, 250);
        }
        if std::env::var("GLIMPSE_CLIENT_ID").is_err() {
            assert_eq!(config.service.client_id, "from-file");
        }
    }

    #[test]
    fn test_unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[engine\n").unwrap();

        let err = GlimpseConfig::load_from(Some(&path)).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}

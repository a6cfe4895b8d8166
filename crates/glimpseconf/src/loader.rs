//! Config file discovery, layered merging, and environment variable overlay.

use crate::{ConfigError, GlimpseConfig, OptionValue};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only returns files
/// that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/glimpse/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("glimpse/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("glimpse.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one config file as a raw TOML table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

pub(crate) fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base`. Nested tables merge key by key, any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Deserialize a merged table on top of compiled defaults.
pub fn from_table(table: toml::Table) -> Result<GlimpseConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut GlimpseConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, env::vars());
}

/// Apply overrides from an explicit set of variables.
pub fn apply_overrides_from<I>(config: &mut GlimpseConfig, sources: &mut ConfigSources, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    // RUST_LOG and OTEL_* sort after GLIMPSE_*, so the standard variables win
    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in vars {
        let applied = match key.as_str() {
            "GLIMPSE_ENDPOINT" => {
                config.service.endpoint = value;
                true
            }
            "GLIMPSE_CLIENT_ID" => {
                config.service.client_id = value;
                true
            }
            "GLIMPSE_DEBOUNCE_MS" => parse_into(&value, &mut config.engine.debounce_ms),
            "GLIMPSE_TIMEOUT_MS" => parse_into(&value, &mut config.engine.request_timeout_ms),
            "GLIMPSE_MAX_ATTEMPTS" => parse_into(&value, &mut config.engine.max_attempts),
            "GLIMPSE_LOG_LEVEL" | "RUST_LOG" => {
                config.telemetry.log_level = value;
                true
            }
            "GLIMPSE_OTLP_ENDPOINT" | "OTEL_EXPORTER_OTLP_ENDPOINT" => {
                config.telemetry.otlp_endpoint = Some(value);
                true
            }
            other => match other.strip_prefix("GLIMPSE_OPTION_") {
                Some(name) if !name.is_empty() => {
                    config
                        .options
                        .insert(name.to_lowercase(), OptionValue::parse(&value));
                    true
                }
                _ => false,
            },
        };

        if applied {
            sources.env_overrides.push(key);
        }
    }
}

fn parse_into<T: std::str::FromStr>(raw: &str, slot: &mut T) -> bool {
    match raw.trim().parse() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

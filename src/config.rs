//! Typed configuration from environment variables or a TOML file.
//!
//! Loads once at startup and fails fast on values that do not parse.
//! Everything has a default; nothing is required.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::DispatchConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub service_name: String,
    pub dispatch: DispatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            otel_endpoint: None,
            log_level: "info".to_string(),
            service_name: "prioq".to_string(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// On-disk layout. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    otel_endpoint: Option<String>,
    log_level: Option<String>,
    service_name: Option<String>,
    #[serde(default)]
    dispatch: FileDispatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileDispatch {
    name: Option<String>,
    poll_interval_ms: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(endpoint) = optional_var("PRIOQ_OTEL_ENDPOINT") {
            config.otel_endpoint = Some(endpoint);
        }
        if let Some(level) = optional_var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(name) = optional_var("PRIOQ_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(raw) = optional_var("PRIOQ_POLL_INTERVAL_MS") {
            config.dispatch.poll_interval = parse_millis("PRIOQ_POLL_INTERVAL_MS", &raw)?;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))?;

        let mut config = Self::default();
        config.otel_endpoint = file.otel_endpoint;
        if let Some(level) = file.log_level {
            config.log_level = level;
        }
        if let Some(name) = file.service_name {
            config.service_name = name;
        }
        if let Some(name) = file.dispatch.name {
            config.dispatch.name = name;
        }
        if let Some(ms) = file.dispatch.poll_interval_ms {
            config.dispatch.poll_interval = millis(ms)?;
        }
        Ok(config)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_millis(name: &str, raw: &str) -> Result<Duration> {
    let ms = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{name} must be a whole number of milliseconds, got {raw:?}")))?;
    millis(ms)
}

fn millis(ms: u64) -> Result<Duration> {
    if ms == 0 {
        return Err(Error::Config("poll interval must be greater than zero".to_string()));
    }
    Ok(Duration::from_millis(ms))
}

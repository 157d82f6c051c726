//! Configuration loader and validator for the calendar importer.
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub import: Import,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Settings consumed by the import pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Import {
    /// IANA zone name that stored (naive) timestamps are expressed in.
    pub time_zone: String,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default)]
    pub feed_url: Option<String>,
}

fn default_max_title_length() -> usize {
    120
}

/// Resolved, typed view of [`Import`] handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub time_zone: Tz,
    pub max_title_length: usize,
}

impl ImportSettings {
    pub fn new(time_zone: Tz, max_title_length: usize) -> Self {
        Self {
            time_zone,
            max_title_length,
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Default SQLite URL under the data directory.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}/events.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }

    pub fn import_settings(&self) -> Result<ImportSettings, ConfigError> {
        let time_zone = parse_time_zone(&self.import.time_zone)?;
        Ok(ImportSettings::new(time_zone, self.import.max_title_length))
    }
}

fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::Invalid("import.time_zone must be a known IANA time zone"))
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.import.time_zone.trim().is_empty() {
        return Err(ConfigError::Invalid("import.time_zone must be non-empty"));
    }
    parse_time_zone(&cfg.import.time_zone)?;
    if cfg.import.max_title_length == 0 {
        return Err(ConfigError::Invalid("import.max_title_length must be > 0"));
    }
    if let Some(url) = &cfg.import.feed_url {
        if url.trim().is_empty() {
            return Err(ConfigError::Invalid("import.feed_url must be non-empty when set"));
        }
    }
    Ok(())
}

/// Example YAML accepted by [`load`].
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

import:
  time_zone: "America/Los_Angeles"
  max_title_length: 120
  feed_url: "https://example.org/calendar.ics"
"#
}

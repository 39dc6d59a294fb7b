//! Tracker configuration.
//!
//! Settings are read from a TOML file, then overridden by environment variables:
//!
//! - `FIIS_CONFIG`: path of the config file (default: platform config dir `config.toml`)
//! - `FIIS_DATA_FILE`: path of the JSON data file
//! - `FIIS_LOG_LEVEL`: default log filter for the CLI
//!
//! ```toml
//! data_file = "/home/me/fiis/fiis_data.json"
//! projection_months = 24
//! dividend_window = 6
//! monthly_cotas = 2.0
//! log_level = "debug"
//! ```

use crate::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_FILE_NAME: &str = "fiis_data.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON data file; platform data dir when unset
    pub data_file: Option<PathBuf>,
    /// Default projection horizon in months
    pub projection_months: usize,
    /// Number of recent payouts averaged when deriving a dividend assumption
    pub dividend_window: Option<usize>,
    /// Default cotas bought per month in history-based projections
    pub monthly_cotas: f64,
    /// Default `tracing` filter for the CLI
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: None,
            projection_months: 12,
            dividend_window: Some(6),
            monthly_cotas: 1.0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config from TOML text; unspecified keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Location of the config file.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = env::var("FIIS_CONFIG") {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `FIIS_DATA_FILE` and `FIIS_LOG_LEVEL` as resolved by `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = value_of("FIIS_DATA_FILE") {
            self.data_file = Some(PathBuf::from(path));
        }
        if let Some(level) = value_of("FIIS_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Resolved data file path.
    pub fn data_path(&self) -> PathBuf {
        if let Some(path) = &self.data_file {
            return path.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join(DATA_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_FILE_NAME))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "fiis", "fiis-tracker")
}

//! Configuration file
//!
//! JSON, one object:
//!
//! ```json
//! { "data_dir": "./data", "log_level": "info", "log_format": "json",
//!   "default_currency": "INR", "default_page_size": 25, "max_page_size": 100 }
//! ```
//!
//! Only `data_dir` is required. `CATALOGDB_DATA_DIR` overrides it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogSettings;
use crate::observability::LogFormat;

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "CATALOGDB_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Data directory (required)
    pub data_dir: PathBuf,

    /// Default log filter, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Currency assigned to products created without one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_currency() -> String {
    "INR".to_string()
}
fn default_page_size() -> u32 {
    25
}
fn default_max_page_size() -> u32 {
    100
}

impl CatalogConfig {
    /// Default configuration for a data directory
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            default_currency: default_currency(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }

    /// Loads and validates a config file, applying the environment override.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_json(&content)?;
        config.apply_data_dir_override(std::env::var(DATA_DIR_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Replaces `data_dir` when an override is present and non-empty.
    pub fn apply_data_dir_override(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }

        self.log_format
            .parse::<LogFormat>()
            .map_err(ConfigError::Invalid)?;

        if self.default_currency.len() != 3
            || !self.default_currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Invalid(format!(
                "default_currency '{}' must be a 3-letter code",
                self.default_currency
            )));
        }

        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid("default_page_size must be > 0".into()));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be > 0".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }

        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// Falls back to JSON for an unvalidated config.
    pub fn log_format(&self) -> LogFormat {
        self.log_format.parse().unwrap_or(LogFormat::Json)
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            default_currency: self.default_currency.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_applied() {
        let config = CatalogConfig::from_json(r#"{"data_dir": "/tmp/catalog"}"#).unwrap();
        assert_eq!(config, CatalogConfig::for_data_dir("/tmp/catalog"));
        assert!(config.validate().is_ok());
        assert_eq!(config.catalog_settings(), CatalogSettings::default());
    }

    #[test]
    fn test_data_dir_required() {
        assert!(matches!(
            CatalogConfig::from_json(r#"{"log_level": "debug"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_override_replaces_data_dir() {
        let mut config = CatalogConfig::for_data_dir("./data");
        config.apply_data_dir_override(Some("/srv/catalog".into()));
        assert_eq!(config.data_path(), Path::new("/srv/catalog"));

        config.apply_data_dir_override(Some("".into()));
        assert_eq!(config.data_path(), Path::new("/srv/catalog"));
    }

    #[test]
    fn test_validation_rules() {
        let mut config = CatalogConfig::for_data_dir("./data");
        config.log_format = "xml".into();
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::for_data_dir("./data");
        config.default_currency = "RUPEE".into();
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::for_data_dir("./data");
        config.default_page_size = 500;
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::for_data_dir("./data");
        config.max_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalogdb.json");
        fs::write(&path, r#"{"data_dir": "./data", "log_format": "pretty"}"#).unwrap();

        let config = CatalogConfig::load(&path).unwrap();
        assert_eq!(config.log_format(), LogFormat::Pretty);

        let missing = CatalogConfig::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}

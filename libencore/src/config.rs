//! Configuration management for Encore

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::storage::StorageConfig;

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://teperyaemo.ru/api/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in humantime notation ("15s", "1m")
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub search_mode: SearchMode,
}

/// Which endpoint a non-empty concert search goes to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// `GET /Concert/paged?page&take&name=<term>`
    #[default]
    Paged,
    /// Legacy `GET /Concert/name/{term}`, single result
    ByName,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> String {
    "15s".to_string()
}

fn default_page_size() -> u32 {
    25
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            page_size: default_page_size(),
            search_mode: SearchMode::default(),
        }
    }
}

impl ApiConfig {
    /// Parsed request timeout
    pub fn timeout(&self) -> Result<Duration> {
        let duration = humantime::parse_duration(&self.timeout).map_err(|e| {
            ConfigError::InvalidValue {
                field: "api.timeout".to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(duration)
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the defaults point at the production API.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", config_path);
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Apply `ENCORE_API_URL` and `ENCORE_MASTER_PASSWORD` overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ENCORE_API_URL") {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
        self.storage.load_master_password_from_env();
    }

    pub fn validate(&self) -> Result<()> {
        let base = &self.api.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", base),
            }
            .into());
        }

        if self.api.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.page_size".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        if self.api.timeout()?.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        self.storage.validate()
    }
}

/// Resolve the configuration file path following the XDG Base Directory layout
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ENCORE_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("encore").join("config.toml"))
}

//! Client configuration management.
//!
//! The pipeline configuration (base URL and request timeout) is resolved
//! once from a named environment profile and never changes for the
//! lifetime of a client. Resolution order, highest first:
//!
//! 1. `ERP_API_BASE_URL` / `ERP_API_TIMEOUT_MS`
//! 2. values in the persisted config file
//! 3. the profile selected by `ERP_ENVIRONMENT` (or the config file)
//!
//! The persisted config lives at `~/.config/erp-client/config.json`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "erp-client";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable selecting the profile
pub const ENVIRONMENT_VAR: &str = "ERP_ENVIRONMENT";
pub const BASE_URL_VAR: &str = "ERP_API_BASE_URL";
pub const TIMEOUT_VAR: &str = "ERP_API_TIMEOUT_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Qa,
    Production,
}

impl Environment {
    /// Read the selector from `ERP_ENVIRONMENT`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var(ENVIRONMENT_VAR).ok().map(|value| Self::from_selector(&value))
    }

    /// Unknown values fall back to development with a warning.
    pub fn from_selector(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!(value = %value, "Unknown environment, using development");
            Environment::Development
        })
    }

    pub fn profile(self) -> ClientConfig {
        match self {
            Environment::Development => ClientConfig::new("http://localhost:8080", 10_000),
            Environment::Qa => ClientConfig::new("https://qa-api.example.com", 15_000),
            Environment::Production => ClientConfig::new("https://api.example.com", 20_000),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Qa => "qa",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "qa" => Ok(Environment::Qa),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Pipeline configuration, immutable once a client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Join a path (with leading slash) onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Apply `ERP_API_BASE_URL` and `ERP_API_TIMEOUT_MS` overrides
    fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_VAR) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(timeout) = std::env::var(TIMEOUT_VAR) {
            match timeout.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout = Duration::from_millis(ms),
                _ => warn!(value = %timeout, "Ignoring invalid {}", TIMEOUT_VAR),
            }
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Environment::Development.profile()
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub environment: Option<Environment>,
    pub base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// The environment in effect: `ERP_ENVIRONMENT`, then the saved one.
    pub fn environment(&self) -> Environment {
        Environment::from_env()
            .or(self.environment)
            .unwrap_or_default()
    }

    /// Resolve the pipeline configuration for this process
    pub fn resolve(&self) -> ClientConfig {
        self.resolve_for(self.environment())
    }

    pub fn resolve_for(&self, environment: Environment) -> ClientConfig {
        let mut config = environment.profile();
        if let Some(ref base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.with_env_overrides()
    }
}

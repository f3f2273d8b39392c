//! Store configuration
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. TOML file (`~/.agora/config.toml` or an explicit path)
//! 3. Environment variables (`.env` in the current directory is honoured)
//!
//! Environment variables:
//!   DATABASE_URL            # Postgres connection string
//!   MONGODB_URL             # Legacy name, used only when DATABASE_URL is unset
//!   AGORA_MAX_CONNECTIONS   # Pool size (default 5)
//!   AGORA_PROFILE_EDIT_PATH # Route invalidated on profile edits

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Default maximum connections for the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

const DEFAULT_PROFILE_EDIT_PATH: &str = "/profile/edit";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file (invalid TOML): {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string. `None` means "not configured"; connecting fails.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Profile updates only invalidate this route
    #[serde(default = "default_profile_edit_path")]
    pub profile_edit_path: String,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_acquire_timeout_secs() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_SECS
}

fn default_profile_edit_path() -> String {
    DEFAULT_PROFILE_EDIT_PATH.to_owned()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            profile_edit_path: default_profile_edit_path(),
        }
    }
}

impl StoreConfig {
    /// Config with an explicit connection string and defaults elsewhere.
    pub fn with_database_url(url: impl Into<String>) -> Self {
        Self {
            database_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    ///
    /// With `path = None` the default location is used when it exists;
    /// a missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        load_dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded store config");
        Ok(config)
    }

    /// Default config file path: ~/.agora/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".agora").join("config.toml"))
    }

    /// Apply overrides from `lookup` (the environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL").or_else(|| non_empty("MONGODB_URL")) {
            self.database_url = Some(url);
        }

        if let Some(raw) = non_empty("AGORA_MAX_CONNECTIONS") {
            self.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "AGORA_MAX_CONNECTIONS",
                    value: raw,
                })?;
        }

        if let Some(path) = non_empty("AGORA_PROFILE_EDIT_PATH") {
            self.profile_edit_path = path;
        }

        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Load `.env` from the current directory if present.
///
/// dotenvy never overwrites variables that are already set.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env loaded: {}", e),
    }
}

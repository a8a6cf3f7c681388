//! Backend configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SQLCACHE_*)
//! 2. TOML config file (if SQLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Backend configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SQLCACHE_*)
/// 2. TOML config file (if SQLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via SQLCACHE_CACHE_DB_PATH environment variable.
    /// There is no default; opening a backend without it fails.
    #[serde(default)]
    pub cache_db_path: Option<PathBuf>,

    /// Compaction factor applied after removals and cleans.
    ///
    /// 0 disables VACUUM, 1 runs it every time, N runs it with probability 1/N.
    /// Set via SQLCACHE_AUTOMATIC_VACUUM_FACTOR environment variable.
    #[serde(default = "default_vacuum_factor")]
    pub automatic_vacuum_factor: u32,

    /// How long a writer waits on a locked database before failing, in milliseconds.
    ///
    /// Set via SQLCACHE_BUSY_TIMEOUT_MS environment variable.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_vacuum_factor() -> u32 {
    10
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            cache_db_path: None,
            automatic_vacuum_factor: default_vacuum_factor(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl BackendConfig {
    /// Defaults pointed at a specific database file.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self { cache_db_path: Some(path.into()), ..Default::default() }
    }

    /// Busy timeout as Duration for use with rusqlite.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SQLCACHE_`
    /// 2. TOML file from `SQLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// A missing `cache_db_path` is not an error here; it surfaces when a
    /// backend is built from the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SQLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SQLCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Get the database path, returning an error if not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_db_path` is not set.
    pub fn require_db_path(&self) -> Result<&Path, ConfigError> {
        self.cache_db_path.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "cache_db_path".into(),
            hint: "Set SQLCACHE_CACHE_DB_PATH environment variable".into(),
        })
    }
}

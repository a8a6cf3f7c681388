//! Configuration validation rules.
//!
//! This module provides validation logic for `BackendConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::BackendConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl BackendConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_db_path` is set but empty, or names an existing directory
    /// - `busy_timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.cache_db_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid { field: "cache_db_path".into(), reason: "must not be empty".into() });
            }
            if path.is_dir() {
                return Err(ConfigError::Invalid {
                    field: "cache_db_path".into(),
                    reason: format!("{} is a directory", path.display()),
                });
            }
        }

        if self.busy_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "busy_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.busy_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "busy_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.automatic_vacuum_factor == 1 {
            tracing::debug!("automatic_vacuum_factor is 1; VACUUM will run after every removal");
        }

        Ok(())
    }
}

//! Unified error types for sqlcache.
//!
//! Only fatal conditions are errors. Statement failures inside composite
//! operations are logged and reported through `false` or empty results.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Unified error type for the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// The store file could not be opened or configured.
    #[error("CACHE_ERROR: unable to open cache database {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The destructive schema rebuild could not be applied.
    #[error("CACHE_ERROR: schema rebuild failed: {0}")]
    SchemaRebuild(#[source] rusqlite::Error),

    /// The version row is still wrong after a successful rebuild.
    #[error("CACHE_ERROR: schema version mismatch after rebuild")]
    SchemaInvalid,

    /// A clean mode name that is not one of the five known modes.
    #[error("INVALID_INPUT: unknown clean mode '{0}'")]
    UnknownCleanMode(String),

    /// No cache entry found for the given id.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Space on the volume hosting the store could not be determined.
    #[error("FILLING_UNAVAILABLE: {0}")]
    FillingUnavailable(String),
}

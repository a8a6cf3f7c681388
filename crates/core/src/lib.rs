//! Core storage engine for sqlcache.
//!
//! This crate provides:
//! - A tag-aware cache backend persisted in a single SQLite file
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CacheBackend, Capabilities, CleanMode, Clock, ManualClock, Metadata, RandomDraw, SqliteBackend, SystemClock,
    VacuumDraw, VacuumScheduler,
};
pub use config::{BackendConfig, ConfigError};
pub use error::Error;

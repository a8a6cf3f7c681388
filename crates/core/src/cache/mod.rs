//! SQLite-backed, tag-aware cache backend.
//!
//! This module provides a persistent cache of opaque byte payloads keyed by
//! string ids, stored in a single SQLite file. It supports:
//!
//! - Lazy, timestamp-based expiration (expired rows are filtered at read time)
//! - Tagging records for bulk invalidation, with AND / OR / NOT tag queries
//! - Five cleaning modes (all, old, matching, not matching, matching any)
//! - Destructive schema rebuild when the on-disk version row is wrong
//! - Probabilistic VACUUM after removals
//!
//! Composite operations are not wrapped in transactions. A failing statement
//! inside one is logged and reported as `false` or an empty result.

pub mod backend;
pub mod capabilities;
pub mod clean;
pub mod clock;
pub mod connection;
pub mod filling;
pub mod records;
pub mod schema;
pub mod tags;
pub mod vacuum;

pub use crate::Error;

pub use backend::CacheBackend;
pub use capabilities::Capabilities;
pub use clean::CleanMode;
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::SqliteBackend;
pub use records::Metadata;
pub use vacuum::{RandomDraw, VacuumDraw, VacuumScheduler};

/// Maps a failed statement to the caller-facing sentinel, logging the cause.
pub(crate) trait OrWarn<T> {
    fn or_warn(self, operation: &'static str, fallback: T) -> T;
}

impl<T> OrWarn<T> for rusqlite::Result<T> {
    fn or_warn(self, operation: &'static str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(operation, error = %e, "cache statement failed");
                fallback
            }
        }
    }
}

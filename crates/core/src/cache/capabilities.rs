//! Static feature flags advertised to the cache coordinator.

use serde::{Deserialize, Serialize};

use super::connection::SqliteBackend;

/// What the backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub automatic_cleaning: bool,
    pub tags: bool,
    pub expired_read: bool,
    pub priority: bool,
    pub infinite_lifetime: bool,
    pub get_list: bool,
}

impl Capabilities {
    /// The fixed set exposed by [`SqliteBackend`](super::SqliteBackend).
    pub const SQLITE: Self = Self {
        automatic_cleaning: true,
        tags: true,
        expired_read: true,
        priority: false,
        infinite_lifetime: true,
        get_list: true,
    };
}

impl SqliteBackend {
    pub fn get_capabilities(&self) -> Capabilities {
        Capabilities::SQLITE
    }

    /// Expired records can be swept by `clean(CleanMode::Old, ..)`.
    pub fn is_automatic_cleaning_available(&self) -> bool {
        Capabilities::SQLITE.automatic_cleaning
    }
}

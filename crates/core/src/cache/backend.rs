//! The contract a cache coordinator programs against.
//!
//! Serialization, key normalization and default lifetimes belong to the
//! coordinator; a backend only stores and returns raw bytes.

use super::capabilities::Capabilities;
use super::clean::CleanMode;
use super::connection::SqliteBackend;
use super::records::Metadata;
use crate::Error;

/// A pluggable cache storage backend.
///
/// `Err` is reserved for fatal conditions (configuration, opening the store,
/// schema repair). Partial failures of composite operations come back as
/// `Ok(false)` or an empty collection.
pub trait CacheBackend {
    /// Content for `id`; expired records only when `skip_validity_check`.
    fn load(&mut self, id: &str, skip_validity_check: bool) -> Result<Option<Vec<u8>>, Error>;

    /// Last-modified time of a valid record.
    fn test(&mut self, id: &str) -> Result<Option<i64>, Error>;

    /// Store `content`; `lifetime` in seconds, `None` for forever.
    fn save(&mut self, id: &str, content: &[u8], tags: &[&str], lifetime: Option<u64>) -> Result<bool, Error>;

    fn remove(&mut self, id: &str) -> Result<bool, Error>;

    fn clean(&mut self, mode: CleanMode, tags: &[&str]) -> Result<bool, Error>;

    /// Ids of valid records.
    fn get_ids(&mut self) -> Result<Vec<String>, Error>;

    fn get_tags(&mut self) -> Result<Vec<String>, Error>;

    fn get_ids_matching_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error>;

    fn get_ids_not_matching_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error>;

    fn get_ids_matching_any_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error>;

    /// Push a valid record's expiry back by `extra_lifetime` seconds.
    fn touch(&mut self, id: &str, extra_lifetime: u64) -> Result<bool, Error>;

    fn get_metadatas(&mut self, id: &str) -> Result<Option<Metadata>, Error>;

    fn get_filling_percentage(&self) -> Result<u8, Error>;

    fn get_capabilities(&self) -> Capabilities;

    fn is_automatic_cleaning_available(&self) -> bool {
        self.get_capabilities().automatic_cleaning
    }
}

impl CacheBackend for SqliteBackend {
    fn load(&mut self, id: &str, skip_validity_check: bool) -> Result<Option<Vec<u8>>, Error> {
        SqliteBackend::load(self, id, skip_validity_check)
    }

    fn test(&mut self, id: &str) -> Result<Option<i64>, Error> {
        SqliteBackend::test(self, id)
    }

    fn save(&mut self, id: &str, content: &[u8], tags: &[&str], lifetime: Option<u64>) -> Result<bool, Error> {
        SqliteBackend::save(self, id, content, tags, lifetime)
    }

    fn remove(&mut self, id: &str) -> Result<bool, Error> {
        SqliteBackend::remove(self, id)
    }

    fn clean(&mut self, mode: CleanMode, tags: &[&str]) -> Result<bool, Error> {
        SqliteBackend::clean(self, mode, tags)
    }

    fn get_ids(&mut self) -> Result<Vec<String>, Error> {
        SqliteBackend::get_ids(self)
    }

    fn get_tags(&mut self) -> Result<Vec<String>, Error> {
        SqliteBackend::get_tags(self)
    }

    fn get_ids_matching_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error> {
        SqliteBackend::get_ids_matching_tags(self, tags)
    }

    fn get_ids_not_matching_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error> {
        SqliteBackend::get_ids_not_matching_tags(self, tags)
    }

    fn get_ids_matching_any_tags(&mut self, tags: &[&str]) -> Result<Vec<String>, Error> {
        SqliteBackend::get_ids_matching_any_tags(self, tags)
    }

    fn touch(&mut self, id: &str, extra_lifetime: u64) -> Result<bool, Error> {
        SqliteBackend::touch(self, id, extra_lifetime)
    }

    fn get_metadatas(&mut self, id: &str) -> Result<Option<Metadata>, Error> {
        SqliteBackend::get_metadatas(self, id)
    }

    fn get_filling_percentage(&self) -> Result<u8, Error> {
        SqliteBackend::get_filling_percentage(self)
    }

    fn get_capabilities(&self) -> Capabilities {
        SqliteBackend::get_capabilities(self)
    }
}

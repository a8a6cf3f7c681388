//! Single-record commands: get, set, test, rm, touch, meta.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlcache_core::{Error, SqliteBackend};

use super::{Output, StatusOutput};

/// Output from the `test` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutput {
    pub id: String,
    pub last_modified: i64,
}

/// Output from the `meta` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaOutput {
    pub id: String,
    pub tags: Vec<String>,
    pub mtime: i64,
    pub expire: i64,
    /// RFC 3339 rendering of `expire`, absent for records that never expire.
    pub expires_at: Option<String>,
}

pub fn get_impl(backend: &mut SqliteBackend, id: &str, expired: bool) -> Result<Output> {
    let content = backend.load(id, expired)?.ok_or_else(|| Error::CacheMiss(id.to_string()))?;
    Ok(Output::raw(content))
}

pub fn set_impl(
    backend: &mut SqliteBackend, id: &str, content: &[u8], tags: &[String], lifetime: Option<u64>,
) -> Result<Output> {
    let ok = backend.save(id, content, tags, lifetime)?;
    Output::json(&StatusOutput { ok }, ok)
}

pub fn test_impl(backend: &mut SqliteBackend, id: &str) -> Result<Output> {
    let last_modified = backend.test(id)?.ok_or_else(|| Error::CacheMiss(id.to_string()))?;
    Output::json(&TestOutput { id: id.to_string(), last_modified }, true)
}

pub fn remove_impl(backend: &mut SqliteBackend, id: &str) -> Result<Output> {
    let ok = backend.remove(id)?;
    Output::json(&StatusOutput { ok }, ok)
}

pub fn touch_impl(backend: &mut SqliteBackend, id: &str, seconds: u64) -> Result<Output> {
    let ok = backend.touch(id, seconds)?;
    Output::json(&StatusOutput { ok }, ok)
}

pub fn meta_impl(backend: &mut SqliteBackend, id: &str) -> Result<Output> {
    let meta = backend.get_metadatas(id)?.ok_or_else(|| Error::CacheMiss(id.to_string()))?;
    let expires_at = (meta.expire != 0)
        .then(|| chrono::DateTime::from_timestamp(meta.expire, 0))
        .flatten()
        .map(|at| at.to_rfc3339());

    let output = MetaOutput { id: id.to_string(), tags: meta.tags, mtime: meta.mtime, expire: meta.expire, expires_at };
    Output::json(&output, true)
}

//! Listing commands: ids, tags, match.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlcache_core::SqliteBackend;

use super::Output;

/// How `match` combines its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    All,
    Any,
    None,
}

/// Output from the `ids` and `match` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdsOutput {
    pub ids: Vec<String>,
}

/// Output from the `tags` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsOutput {
    pub tags: Vec<String>,
}

pub fn ids_impl(backend: &mut SqliteBackend) -> Result<Output> {
    let ids = backend.get_ids()?;
    Output::json(&IdsOutput { ids }, true)
}

pub fn tags_impl(backend: &mut SqliteBackend) -> Result<Output> {
    let tags = backend.get_tags()?;
    Output::json(&TagsOutput { tags }, true)
}

pub fn match_impl(backend: &mut SqliteBackend, op: TagMatch, tags: &[String]) -> Result<Output> {
    let ids = match op {
        TagMatch::All => backend.get_ids_matching_tags(tags)?,
        TagMatch::Any => backend.get_ids_matching_any_tags(tags)?,
        TagMatch::None => backend.get_ids_not_matching_tags(tags)?,
    };
    Output::json(&IdsOutput { ids }, true)
}

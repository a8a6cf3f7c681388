//! Maintenance commands: clean, fill, caps.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlcache_core::{Capabilities, CleanMode, SqliteBackend};

use super::Output;

/// Output from the `clean` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanOutput {
    pub mode: CleanMode,
    pub ok: bool,
    /// Valid ids left after the clean.
    pub remaining: usize,
}

/// Output from the `fill` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillOutput {
    pub percent_used: u8,
}

pub fn clean_impl(backend: &mut SqliteBackend, mode: &str, tags: &[String]) -> Result<Output> {
    let mode: CleanMode = mode.parse()?;
    if mode.uses_tags() && tags.is_empty() {
        tracing::warn!(mode = %mode, "tag clean mode given no tags");
    }

    let ok = backend.clean(mode, tags)?;
    let remaining = backend.get_ids()?.len();
    Output::json(&CleanOutput { mode, ok, remaining }, ok)
}

pub fn fill_impl(backend: &SqliteBackend) -> Result<Output> {
    let percent_used = backend.get_filling_percentage()?;
    Output::json(&FillOutput { percent_used }, true)
}

pub fn caps_impl(backend: &SqliteBackend) -> Result<Output> {
    let caps: Capabilities = backend.get_capabilities();
    Output::json(&caps, true)
}

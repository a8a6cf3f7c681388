//! Command implementations.
//!
//! Every command runs against an open backend and produces an [`Output`]:
//! pretty JSON for everything except `get`, which writes the raw content.

use std::io::Read;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlcache_core::SqliteBackend;

use crate::Command;

pub mod entry;
pub mod maintenance;
pub mod query;

/// What a command prints, and whether it fully succeeded.
#[derive(Debug)]
pub struct Output {
    pub body: Vec<u8>,
    pub ok: bool,
}

impl Output {
    pub fn json<T: Serialize>(value: &T, ok: bool) -> Result<Self> {
        let mut body = serde_json::to_vec_pretty(value).context("failed to serialize output")?;
        body.push(b'\n');
        Ok(Self { body, ok })
    }

    pub fn raw(body: Vec<u8>) -> Self {
        Self { body, ok: true }
    }
}

/// Result of a command that only reports success.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct StatusOutput {
    pub ok: bool,
}

pub fn run(backend: &mut SqliteBackend, command: Command) -> Result<Output> {
    match command {
        Command::Get { id, expired } => entry::get_impl(backend, &id, expired),
        Command::Set { id, value, tags, lifetime } => {
            let content = match value {
                Some(value) => value.into_bytes(),
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf).context("failed to read value from stdin")?;
                    buf
                }
            };
            entry::set_impl(backend, &id, &content, &tags, lifetime)
        }
        Command::Test { id } => entry::test_impl(backend, &id),
        Command::Rm { id } => entry::remove_impl(backend, &id),
        Command::Touch { id, seconds } => entry::touch_impl(backend, &id, seconds),
        Command::Meta { id } => entry::meta_impl(backend, &id),
        Command::Ids => query::ids_impl(backend),
        Command::Tags => query::tags_impl(backend),
        Command::Match { tags, any, none } => {
            let op = if any {
                query::TagMatch::Any
            } else if none {
                query::TagMatch::None
            } else {
                query::TagMatch::All
            };
            query::match_impl(backend, op, &tags)
        }
        Command::Clean { mode, tags } => maintenance::clean_impl(backend, &mode, &tags),
        Command::Fill => maintenance::fill_impl(backend),
        Command::Caps => maintenance::caps_impl(backend),
    }
}

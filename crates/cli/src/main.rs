//! sqlcache command-line entry point.
//!
//! Opens the configured cache database and runs one maintenance or
//! inspection command against it. Logging goes to stderr so command output
//! on stdout stays machine-readable.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlcache_core::{BackendConfig, SqliteBackend};
use tracing_subscriber::EnvFilter;

mod commands;

/// Inspect and maintain a sqlcache database.
#[derive(Debug, Parser)]
#[command(name = "sqlcache", version, about)]
struct Cli {
    /// Database file; overrides SQLCACHE_CACHE_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Vacuum factor; overrides SQLCACHE_AUTOMATIC_VACUUM_FACTOR.
    #[arg(long, global = true)]
    vacuum_factor: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the content stored under an id.
    Get {
        id: String,
        /// Return the content even if the record has expired.
        #[arg(long)]
        expired: bool,
    },
    /// Store a value (from --value, or stdin when omitted).
    Set {
        id: String,
        #[arg(long)]
        value: Option<String>,
        /// Tag to attach; repeatable.
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Lifetime in seconds; omitted means forever.
        #[arg(long)]
        lifetime: Option<u64>,
    },
    /// Show the last-modified time of a valid record.
    Test { id: String },
    /// Remove a record and its tags.
    Rm { id: String },
    /// Extend a valid record's lifetime.
    Touch { id: String, seconds: u64 },
    /// List ids of valid records.
    Ids,
    /// List every tag in use.
    Tags,
    /// List ids by tag (all tags by default).
    Match {
        #[arg(required = true)]
        tags: Vec<String>,
        /// Any of the tags.
        #[arg(long, conflicts_with = "none")]
        any: bool,
        /// None of the tags.
        #[arg(long)]
        none: bool,
    },
    /// Bulk clean: all, old, matching_tag, not_matching_tag, matching_any_tag.
    Clean { mode: String, tags: Vec<String> },
    /// Show tags and timestamps of a record.
    Meta { id: String },
    /// Show how full the volume holding the database is.
    Fill,
    /// Show the backend capabilities.
    Caps,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = BackendConfig::load()?;
    if let Some(db) = cli.db {
        config.cache_db_path = Some(db);
    }
    if let Some(factor) = cli.vacuum_factor {
        config.automatic_vacuum_factor = factor;
    }

    let mut backend = SqliteBackend::new(&config)?;
    tracing::debug!(command = ?cli.command, "running sqlcache command");

    let output = commands::run(&mut backend, cli.command)?;
    backend.close();

    std::io::stdout().write_all(&output.body).context("failed to write output")?;
    if !output.ok {
        std::process::exit(1);
    }
    Ok(())
}

//! Database connection management with pragma configuration.
//!
//! This module owns the single SQLite handle of a backend. The handle is
//! opened on first use, configured with a busy timeout so contending writers
//! wait instead of failing, and the schema is reconciled before any caller
//! sees it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use super::clock::{Clock, SystemClock};
use super::schema::{self, SchemaState};
use super::vacuum::{VacuumDraw, VacuumScheduler};
use crate::Error;
use crate::config::BackendConfig;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Lazily opened SQLite handle plus its schema state.
#[derive(Debug)]
pub(crate) struct Database {
    location: Location,
    busy_timeout: Duration,
    conn: Option<Connection>,
    schema: SchemaState,
}

impl Database {
    fn new(location: Location, busy_timeout: Duration) -> Self {
        Self { location, busy_timeout, conn: None, schema: SchemaState::Unchecked }
    }

    /// Path of the backing file, if there is one.
    pub(crate) fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Open the connection if needed and make sure the schema is valid.
    pub(crate) fn ready(&mut self) -> Result<&Connection, Error> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open()?,
        };
        let conn = self.conn.insert(conn);
        schema::reconcile(conn, &mut self.schema)?;
        Ok(&*conn)
    }

    fn open(&self) -> Result<Connection, Error> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path).map_err(|e| Error::Open { path: path.clone(), source: e })?,
            Location::Memory => Connection::open_in_memory()
                .map_err(|e| Error::Open { path: PathBuf::from(":memory:"), source: e })?,
        };

        conn.busy_timeout(self.busy_timeout)
            .and_then(|()| {
                conn.execute_batch(
                    "PRAGMA synchronous=NORMAL;
                     PRAGMA temp_store=MEMORY;",
                )
            })
            .map_err(|e| Error::Open { path: self.display_path(), source: e })?;

        tracing::debug!(path = %self.display_path().display(), "opened cache database");
        Ok(conn)
    }

    fn display_path(&self) -> PathBuf {
        self.path().map_or_else(|| PathBuf::from(":memory:"), Path::to_path_buf)
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(error = %e, "failed to close cache database cleanly");
            }
        }
        // An in-memory database does not outlive its handle.
        if matches!(self.location, Location::Memory) {
            self.schema = SchemaState::Unchecked;
        }
    }
}

/// Cache backend persisted in a single SQLite file.
///
/// Every public operation reconciles the schema first (once per instance),
/// then runs its statements on the one connection this backend owns.
pub struct SqliteBackend {
    pub(crate) db: Database,
    pub(crate) vacuum: VacuumScheduler,
    pub(crate) clock: Box<dyn Clock>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("db", &self.db)
            .field("vacuum", &self.vacuum)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Build a backend from configuration.
    ///
    /// Nothing is opened yet; the file is created or opened on the first
    /// operation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `cache_db_path` is missing or the
    /// configuration fails validation.
    pub fn new(config: &BackendConfig) -> Result<Self, Error> {
        config.validate()?;
        let path = config.require_db_path()?.to_path_buf();

        Ok(Self {
            db: Database::new(Location::File(path), config.busy_timeout()),
            vacuum: VacuumScheduler::new(config.automatic_vacuum_factor),
            clock: Box::new(SystemClock),
        })
    }

    /// Open a backend at the specified path with default settings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        Self::new(&BackendConfig::for_path(path))
    }

    /// Open an in-memory backend for testing.
    ///
    /// Behaves like a file-backed one except that there is no volume to
    /// report a filling percentage for.
    pub fn open_in_memory() -> Self {
        let config = BackendConfig::default();
        Self {
            db: Database::new(Location::Memory, config.busy_timeout()),
            vacuum: VacuumScheduler::new(config.automatic_vacuum_factor),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the random source used by the vacuum scheduler.
    pub fn with_vacuum_draw(mut self, draw: impl VacuumDraw + 'static) -> Self {
        self.vacuum.set_draw(draw);
        self
    }

    /// Change the vacuum factor (0 disables VACUUM).
    pub fn with_vacuum_factor(mut self, factor: u32) -> Self {
        self.vacuum.set_factor(factor);
        self
    }

    /// Path of the backing file, or `None` for an in-memory backend.
    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    /// Close the connection.
    ///
    /// The schema is not re-checked on the next operation, which reopens
    /// the file.
    pub fn close(&mut self) {
        self.db.close();
    }
}

//! Schema verification and destructive rebuild.
//!
//! A single `version` row records the schema revision. Anything other than
//! [`SCHEMA_VERSION`] (a missing table, a missing row, another number) wipes
//! every table and recreates the layout from scratch. There is no migration
//! between versions.

use rusqlite::{Connection, TransactionBehavior};

use super::Error;

/// Revision number the engine expects in the `version` table.
pub const SCHEMA_VERSION: i64 = 1;

/// Drops and recreates every table and index.
const REBUILD_SQL: &str = "
    DROP INDEX IF EXISTS tag_id_index;
    DROP INDEX IF EXISTS tag_name_index;
    DROP INDEX IF EXISTS tag_name_id_index;
    DROP INDEX IF EXISTS cache_id_expire_index;
    DROP TABLE IF EXISTS version;
    DROP TABLE IF EXISTS cache;
    DROP TABLE IF EXISTS tag;
    CREATE TABLE version (num INTEGER PRIMARY KEY);
    CREATE TABLE cache (
        id TEXT PRIMARY KEY,
        content BLOB,
        lastModified INTEGER,
        expire INTEGER
    );
    CREATE TABLE tag (name TEXT, id TEXT);
    CREATE INDEX tag_id_index ON tag(id);
    CREATE INDEX tag_name_index ON tag(name);
    CREATE UNIQUE INDEX tag_name_id_index ON tag(name, id);
    CREATE INDEX cache_id_expire_index ON cache(id, expire);
";

/// Per-backend schema state. Once `Valid`, the database is not checked again
/// for the lifetime of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaState {
    #[default]
    Unchecked,
    Valid,
    Rebuilding,
}

/// Bring the schema to a usable state.
///
/// Checks the version row and, on any mismatch, rebuilds and re-checks.
///
/// # Errors
///
/// Returns `Error::SchemaRebuild` if the rebuild transaction fails (it is
/// rolled back) and `Error::SchemaInvalid` if the version is still wrong
/// after a committed rebuild.
pub fn reconcile(conn: &mut Connection, state: &mut SchemaState) -> Result<(), Error> {
    if *state == SchemaState::Valid {
        return Ok(());
    }

    if version_is_current(conn) {
        tracing::debug!(version = SCHEMA_VERSION, "cache schema verified");
        *state = SchemaState::Valid;
        return Ok(());
    }

    tracing::warn!("cache schema missing or outdated; rebuilding and discarding all cached data");
    *state = SchemaState::Rebuilding;

    if let Err(e) = rebuild(conn) {
        tracing::error!(error = %e, "cache schema rebuild failed");
        *state = SchemaState::Unchecked;
        return Err(Error::SchemaRebuild(e));
    }

    if !version_is_current(conn) {
        tracing::error!("cache schema still invalid after rebuild");
        *state = SchemaState::Unchecked;
        return Err(Error::SchemaInvalid);
    }

    *state = SchemaState::Valid;
    Ok(())
}

/// True only when the version row reads back exactly [`SCHEMA_VERSION`].
pub fn version_is_current(conn: &Connection) -> bool {
    match conn.query_row("SELECT num FROM version", [], |row| row.get::<_, i64>(0)) {
        Ok(num) => num == SCHEMA_VERSION,
        Err(e) => {
            tracing::debug!(error = %e, "cache schema version unreadable");
            false
        }
    }
}

/// Recreate every table inside one exclusive transaction.
///
/// Dropping the transaction without committing rolls it back, so any
/// failing statement leaves the previous file contents in place.
pub fn rebuild(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;
    tx.execute_batch(REBUILD_SQL)?;
    tx.execute("INSERT INTO version (num) VALUES (?1)", [SCHEMA_VERSION])?;
    tx.commit()
}

//! Record CRUD and expiration.
//!
//! A record is `(id, content, lastModified, expire)` where `expire = 0`
//! means never. Expired rows stay on disk until removed or cleaned; reads
//! filter them out unless the caller asks for expired data explicitly.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use super::OrWarn;
use super::connection::SqliteBackend;
use super::tags::{register_tag, tags_of};
use crate::Error;

/// Tags and timestamps for one cache id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub tags: Vec<String>,
    /// Last write or touch, epoch seconds.
    pub mtime: i64,
    /// Expiry, epoch seconds; 0 for never.
    pub expire: i64,
}

impl SqliteBackend {
    /// Get the content stored under `id`.
    ///
    /// Returns None if the id is unknown, or expired and
    /// `skip_validity_check` is false.
    pub fn load(&mut self, id: &str, skip_validity_check: bool) -> Result<Option<Vec<u8>>, Error> {
        let now = self.clock.now();
        let conn = self.db.ready()?;

        let result = if skip_validity_check {
            conn.query_row("SELECT content FROM cache WHERE id = ?1", params![id], |row| row.get(0))
                .optional()
        } else {
            conn.query_row(
                "SELECT content FROM cache WHERE id = ?1 AND (expire = 0 OR expire > ?2)",
                params![id, now],
                |row| row.get(0),
            )
            .optional()
        };

        Ok(result.or_warn("load", None))
    }

    /// Get the last-modified time of a currently valid record.
    pub fn test(&mut self, id: &str) -> Result<Option<i64>, Error> {
        let now = self.clock.now();
        let conn = self.db.ready()?;

        let result = conn
            .query_row(
                "SELECT lastModified FROM cache WHERE id = ?1 AND (expire = 0 OR expire > ?2)",
                params![id, now],
                |row| row.get(0),
            )
            .optional();

        Ok(result.or_warn("test", None))
    }

    /// Store `content` under `id` and attach `tags`.
    ///
    /// `lifetime` is in seconds; `None` stores the record forever. An
    /// existing record is deleted and reinserted, not updated. Tags are
    /// registered after the row is written and a failing tag does not undo
    /// the write; the result is `false` if any step failed.
    pub fn save<S: AsRef<str>>(
        &mut self, id: &str, content: &[u8], tags: &[S], lifetime: Option<u64>,
    ) -> Result<bool, Error> {
        let now = self.clock.now();
        let expire = match lifetime {
            None => 0,
            Some(seconds) => now.saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX)),
        };
        let conn = self.db.ready()?;

        conn.execute("DELETE FROM cache WHERE id = ?1", params![id])
            .or_warn("save.delete", 0);

        let inserted = conn
            .execute(
                "INSERT INTO cache (id, content, lastModified, expire) VALUES (?1, ?2, ?3, ?4)",
                params![id, content, now, expire],
            )
            .map(|_| true)
            .or_warn("save.insert", false);
        if !inserted {
            tracing::warn!(id, "unable to store cache record");
            return Ok(false);
        }

        let mut result = true;
        for tag in tags {
            result = register_tag(conn, id, tag.as_ref()) && result;
        }
        Ok(result)
    }

    /// Remove the record and its tag associations.
    ///
    /// Returns `true` only if the record existed and both deletes ran.
    /// May trigger an automatic VACUUM.
    pub fn remove(&mut self, id: &str) -> Result<bool, Error> {
        let conn = self.db.ready()?;

        let existed = conn
            .query_row("SELECT COUNT(*) FROM cache WHERE id = ?1", params![id], |row| row.get::<_, i64>(0))
            .map(|count| count > 0)
            .or_warn("remove.count", false);
        let record_deleted = conn
            .execute("DELETE FROM cache WHERE id = ?1", params![id])
            .map(|_| true)
            .or_warn("remove.record", false);
        let tags_deleted = conn
            .execute("DELETE FROM tag WHERE id = ?1", params![id])
            .map(|_| true)
            .or_warn("remove.tags", false);

        self.vacuum.after_removal(conn);

        Ok(existed && record_deleted && tags_deleted)
    }

    /// Extend a valid record's lifetime by `extra_lifetime` seconds.
    ///
    /// The new expiry is the stored expiry plus the extension, not now plus
    /// the extension, saturating at `i64::MAX`. A record stored forever
    /// (`expire = 0`) gets `0 + extension` like any other. Expired or unknown
    /// ids are left alone and report `false`.
    pub fn touch(&mut self, id: &str, extra_lifetime: u64) -> Result<bool, Error> {
        let now = self.clock.now();
        let extra = i64::try_from(extra_lifetime).unwrap_or(i64::MAX);
        let conn = self.db.ready()?;

        let updated = conn
            .execute(
                "UPDATE cache
                 SET lastModified = ?1,
                     expire = CASE WHEN expire > 9223372036854775807 - ?2 THEN 9223372036854775807
                                   ELSE expire + ?2 END
                 WHERE id = ?3 AND (expire = 0 OR expire > ?1)",
                params![now, extra, id],
            )
            .or_warn("touch", 0);

        Ok(updated > 0)
    }

    /// Ids of every currently valid record.
    pub fn get_ids(&mut self) -> Result<Vec<String>, Error> {
        let now = self.clock.now();
        let conn = self.db.ready()?;

        let result = conn.prepare("SELECT id FROM cache WHERE (expire = 0 OR expire > ?1)").and_then(|mut stmt| {
            let ids = stmt.query_map(params![now], |row| row.get(0))?.collect::<rusqlite::Result<Vec<String>>>();
            ids
        });

        Ok(result.or_warn("get_ids", Vec::new()))
    }

    /// Tags, last-modified time and expiry for `id`.
    ///
    /// Returns None when there is no record row, whatever its validity.
    /// Tag lookup and record lookup are separate statements.
    pub fn get_metadatas(&mut self, id: &str) -> Result<Option<Metadata>, Error> {
        let conn = self.db.ready()?;

        let tags = tags_of(conn, id).or_warn("get_metadatas.tags", Vec::new());

        let row = conn
            .query_row("SELECT lastModified, expire FROM cache WHERE id = ?1", params![id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .optional()
            .or_warn("get_metadatas.record", None);

        Ok(row.map(|(mtime, expire)| Metadata { tags, mtime, expire }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const T0: i64 = 1_700_000_000;

    fn backend() -> (SqliteBackend, ManualClock) {
        let clock = ManualClock::new(T0);
        let backend = SqliteBackend::open_in_memory().with_clock(clock.clone()).with_vacuum_factor(0);
        (backend, clock)
    }

    const NO_TAGS: &[&str] = &[];

    #[test]
    fn test_save_and_load() {
        let (mut db, _) = backend();
        assert!(db.save("a", b"payload\x00bytes", NO_TAGS, None).unwrap());
        assert_eq!(db.load("a", false).unwrap(), Some(b"payload\x00bytes".to_vec()));
    }

    #[test]
    fn test_load_missing() {
        let (mut db, _) = backend();
        assert!(db.load("nonexistent", false).unwrap().is_none());
        assert!(db.load("nonexistent", true).unwrap().is_none());
        assert!(db.test("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_lazy_expiry() {
        let (mut db, clock) = backend();
        db.save("a", b"data", NO_TAGS, Some(5)).unwrap();
        assert_eq!(db.test("a").unwrap(), Some(T0));

        clock.advance(5);

        assert!(db.load("a", false).unwrap().is_none());
        assert_eq!(db.load("a", true).unwrap(), Some(b"data".to_vec()));
        assert!(db.test("a").unwrap().is_none());
        // Still on disk until removed or cleaned.
        assert!(db.get_metadatas("a").unwrap().is_some());
    }

    #[test]
    fn test_save_overwrites() {
        let (mut db, clock) = backend();
        db.save("a", b"old", &["t1"], Some(10)).unwrap();
        clock.advance(3);
        db.save("a", b"new", &["t2"], None).unwrap();

        assert_eq!(db.load("a", false).unwrap(), Some(b"new".to_vec()));
        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert_eq!(meta.mtime, T0 + 3);
        assert_eq!(meta.expire, 0);
        // Tags from the first save are not cleared by a re-save.
        assert_eq!(meta.tags.len(), 2);
    }

    #[test]
    fn test_remove() {
        let (mut db, _) = backend();
        db.save("a", b"data", &["t1"], None).unwrap();

        assert!(db.remove("a").unwrap());
        assert!(db.load("a", true).unwrap().is_none());
        assert!(db.get_tags().unwrap().is_empty());

        assert!(!db.remove("a").unwrap());
    }

    #[test]
    fn test_touch_extends_stored_expiry() {
        let (mut db, clock) = backend();
        db.save("a", b"data", NO_TAGS, Some(100)).unwrap();
        clock.advance(40);

        assert!(db.touch("a", 30).unwrap());

        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert_eq!(meta.expire, T0 + 130);
        assert_eq!(meta.mtime, T0 + 40);
    }

    #[test]
    fn test_touch_expired_or_missing_is_noop() {
        let (mut db, clock) = backend();
        db.save("a", b"data", NO_TAGS, Some(10)).unwrap();
        clock.advance(10);

        assert!(!db.touch("a", 100).unwrap());
        assert!(!db.touch("missing", 100).unwrap());

        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert_eq!(meta.expire, T0 + 10);
        assert_eq!(meta.mtime, T0);
    }

    #[test]
    fn test_touch_adds_to_immortal_expire() {
        let (mut db, clock) = backend();
        db.save("a", b"data", NO_TAGS, None).unwrap();
        clock.advance(7);

        assert!(db.touch("a", 60).unwrap());
        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert_eq!(meta.expire, 60);
        assert_eq!(meta.mtime, T0 + 7);
        assert!(db.load("a", false).unwrap().is_none());
    }

    #[test]
    fn test_touch_saturates_expire() {
        let (mut db, _) = backend();
        db.save("a", b"1", NO_TAGS, Some(60)).unwrap();

        assert!(db.touch("a", u64::MAX).unwrap());
        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert_eq!(meta.expire, i64::MAX);
        assert_eq!(db.load("a", false).unwrap(), Some(b"1".to_vec()));

        assert!(db.touch("a", 10).unwrap());
        assert_eq!(db.get_metadatas("a").unwrap().unwrap().expire, i64::MAX);
    }

    #[test]
    fn test_metadata_survives_missing_tag_table() {
        let (mut db, _) = backend();
        db.save("a", b"1", &["t"], Some(60)).unwrap();
        db.db.ready().unwrap().execute_batch("DROP TABLE tag").unwrap();

        let meta = db.get_metadatas("a").unwrap().unwrap();
        assert!(meta.tags.is_empty());
        assert_eq!(meta.expire, T0 + 60);
    }

    #[test]
    fn test_get_ids_skips_expired() {
        let (mut db, clock) = backend();
        db.save("forever", b"1", NO_TAGS, None).unwrap();
        db.save("short", b"2", NO_TAGS, Some(1)).unwrap();
        db.save("long", b"3", NO_TAGS, Some(1_000)).unwrap();
        clock.advance(1);

        let mut ids = db.get_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["forever", "long"]);
    }

    #[test]
    fn test_get_metadatas() {
        let (mut db, _) = backend();
        db.save("a", b"data", &["t1", "t2"], Some(60)).unwrap();

        let mut meta = db.get_metadatas("a").unwrap().unwrap();
        meta.tags.sort();
        assert_eq!(meta, Metadata { tags: vec!["t1".into(), "t2".into()], mtime: T0, expire: T0 + 60 });
        assert!(db.get_metadatas("missing").unwrap().is_none());
    }
}

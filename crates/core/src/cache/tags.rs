//! Tag index: the many-to-many relation between tag names and cache ids.
//!
//! None of the queries here look at record expiry. An expired record still
//! matches its tags, and `get_ids_not_matching_tags` walks every stored id,
//! valid or not, unlike `get_ids`.

use std::collections::HashSet;

use rusqlite::{Connection, params};

use super::OrWarn;
use super::connection::SqliteBackend;
use crate::Error;

/// Attach `tag` to `id`, at most once per pair.
///
/// The existence check and the insert are one statement, so concurrent
/// writers cannot slip a duplicate between them.
pub(crate) fn register_tag(conn: &Connection, id: &str, tag: &str) -> bool {
    let result = conn.execute(
        "INSERT INTO tag (name, id)
         SELECT ?1, ?2
         WHERE NOT EXISTS (SELECT 1 FROM tag WHERE name = ?1 AND id = ?2)",
        params![tag, id],
    );
    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(id, tag, error = %e, "unable to register cache tag");
            false
        }
    }
}

/// Tag names attached to `id`.
pub(crate) fn tags_of(conn: &Connection, id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached("SELECT name FROM tag WHERE id = ?1")?;
    let names = stmt.query_map(params![id], |row| row.get(0))?.collect();
    names
}

/// Distinct ids carrying `tag`.
fn ids_with_tag(conn: &Connection, tag: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached("SELECT DISTINCT(id) FROM tag WHERE name = ?1")?;
    let ids = stmt.query_map(params![tag], |row| row.get(0))?.collect();
    ids
}

fn all_tags(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT(name) FROM tag")?;
    let names = stmt.query_map([], |row| row.get(0))?.collect();
    names
}

fn ids_matching_all<S: AsRef<str>>(conn: &Connection, tags: &[S]) -> rusqlite::Result<Vec<String>> {
    let Some((first, rest)) = tags.split_first() else {
        return Ok(Vec::new());
    };

    let mut ids = ids_with_tag(conn, first.as_ref())?;
    for tag in rest {
        if ids.is_empty() {
            break;
        }
        let carrying: HashSet<String> = ids_with_tag(conn, tag.as_ref())?.into_iter().collect();
        ids.retain(|id| carrying.contains(id));
    }
    Ok(ids)
}

fn ids_matching_any<S: AsRef<str>>(conn: &Connection, tags: &[S]) -> rusqlite::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for tag in tags {
        for id in ids_with_tag(conn, tag.as_ref())? {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

/// One membership probe per (id, tag) pair, as the index is laid out.
fn ids_matching_none<S: AsRef<str>>(conn: &Connection, tags: &[S]) -> rusqlite::Result<Vec<String>> {
    let mut all = conn.prepare("SELECT id FROM cache")?;
    let candidates = all.query_map([], |row| row.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;

    let mut probe = conn.prepare_cached("SELECT COUNT(*) FROM tag WHERE name = ?1 AND id = ?2")?;
    let mut ids = Vec::new();
    'candidates: for id in candidates {
        for tag in tags {
            let count: i64 = probe.query_row(params![tag.as_ref(), id], |row| row.get(0))?;
            if count > 0 {
                continue 'candidates;
            }
        }
        ids.push(id);
    }
    Ok(ids)
}

impl SqliteBackend {
    /// Every tag name in use, including tags of expired records.
    pub fn get_tags(&mut self) -> Result<Vec<String>, Error> {
        let conn = self.db.ready()?;
        Ok(all_tags(conn).or_warn("get_tags", Vec::new()))
    }

    /// Ids carrying every one of `tags` (logical AND).
    ///
    /// Empty input yields an empty result.
    pub fn get_ids_matching_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Vec<String>, Error> {
        let conn = self.db.ready()?;
        Ok(ids_matching_all(conn, tags).or_warn("get_ids_matching_tags", Vec::new()))
    }

    /// Ids carrying at least one of `tags` (logical OR), without duplicates.
    pub fn get_ids_matching_any_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Vec<String>, Error> {
        let conn = self.db.ready()?;
        Ok(ids_matching_any(conn, tags).or_warn("get_ids_matching_any_tags", Vec::new()))
    }

    /// Stored ids carrying none of `tags`.
    ///
    /// Walks every record row, expired ones included. Empty input yields
    /// every stored id.
    pub fn get_ids_not_matching_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Vec<String>, Error> {
        let conn = self.db.ready()?;
        Ok(ids_matching_none(conn, tags).or_warn("get_ids_not_matching_tags", Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn sorted(mut ids: Vec<String>) -> Vec<String> {
        ids.sort();
        ids
    }

    /// a:[t1,t2], b:[t1], c:[t2], all expired by the time queries run.
    fn tagged_backend() -> SqliteBackend {
        let clock = ManualClock::new(1_000);
        let mut db = SqliteBackend::open_in_memory().with_clock(clock.clone()).with_vacuum_factor(0);
        db.save("a", b"1", &["t1", "t2"], Some(10)).unwrap();
        db.save("b", b"2", &["t1"], Some(10)).unwrap();
        db.save("c", b"3", &["t2"], Some(10)).unwrap();
        clock.advance(3_600);
        db
    }

    #[test]
    fn test_matching_all_tags() {
        let mut db = tagged_backend();
        assert_eq!(db.get_ids_matching_tags(&["t1", "t2"]).unwrap(), vec!["a"]);
        assert_eq!(sorted(db.get_ids_matching_tags(&["t1"]).unwrap()), vec!["a", "b"]);
        assert!(db.get_ids_matching_tags(&["t1", "missing"]).unwrap().is_empty());
    }

    #[test]
    fn test_matching_any_tags() {
        let mut db = tagged_backend();
        assert_eq!(sorted(db.get_ids_matching_any_tags(&["t1", "t2"]).unwrap()), vec!["a", "b", "c"]);
        assert_eq!(sorted(db.get_ids_matching_any_tags(&["t2", "missing"]).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn test_not_matching_tags() {
        let mut db = tagged_backend();
        assert_eq!(db.get_ids_not_matching_tags(&["t1"]).unwrap(), vec!["c"]);
        assert!(db.get_ids_not_matching_tags(&["t1", "t2"]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_tag_lists() {
        let mut db = tagged_backend();
        let none: &[&str] = &[];
        assert!(db.get_ids_matching_tags(none).unwrap().is_empty());
        assert!(db.get_ids_matching_any_tags(none).unwrap().is_empty());
        assert_eq!(sorted(db.get_ids_not_matching_tags(none).unwrap()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_tags_ignores_expiry() {
        let mut db = tagged_backend();
        assert!(db.get_ids().unwrap().is_empty());
        assert_eq!(sorted(db.get_tags().unwrap()), vec!["t1", "t2"]);
    }

    #[test]
    fn test_register_tag_is_idempotent() {
        let mut db = SqliteBackend::open_in_memory();
        db.save("a", b"1", &["t1", "t1"], None).unwrap();
        db.save("a", b"2", &["t1"], None).unwrap();

        let conn = db.db.ready().unwrap();
        assert!(register_tag(conn, "a", "t1"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tag WHERE name = 't1' AND id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_stale_association_still_matches() {
        let mut db = SqliteBackend::open_in_memory();
        let conn = db.db.ready().unwrap();
        assert!(register_tag(conn, "ghost", "t1"));

        assert_eq!(db.get_ids_matching_tags(&["t1"]).unwrap(), vec!["ghost"]);
        // Not a record row, so the complement query never sees it.
        assert!(db.get_ids_not_matching_tags(&["other"]).unwrap().is_empty());
        assert!(db.get_metadatas("ghost").unwrap().is_none());
    }
}

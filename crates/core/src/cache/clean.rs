//! Bulk cleaning.
//!
//! `All` and `Old` are single bulk deletes followed by one vacuum roll.
//! The tag modes resolve ids through the tag index and call
//! [`SqliteBackend::remove`] for each, so they may roll for a vacuum once
//! per removed id.

use std::fmt;
use std::str::FromStr;

use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::OrWarn;
use super::connection::SqliteBackend;
use crate::Error;

/// Which records a clean removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanMode {
    /// Every record and every tag association.
    All,
    /// Records with `0 < expire <= now`, and their tags.
    Old,
    /// Records carrying all of the given tags.
    MatchingTag,
    /// Records carrying none of the given tags.
    NotMatchingTag,
    /// Records carrying any of the given tags.
    MatchingAnyTag,
}

impl CleanMode {
    pub const ALL_MODES: [CleanMode; 5] =
        [Self::All, Self::Old, Self::MatchingTag, Self::NotMatchingTag, Self::MatchingAnyTag];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Old => "old",
            Self::MatchingTag => "matching_tag",
            Self::NotMatchingTag => "not_matching_tag",
            Self::MatchingAnyTag => "matching_any_tag",
        }
    }

    /// Whether the mode reads the tag list.
    pub fn uses_tags(self) -> bool {
        !matches!(self, Self::All | Self::Old)
    }
}

impl fmt::Display for CleanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL_MODES
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| Error::UnknownCleanMode(s.to_string()))
    }
}

impl SqliteBackend {
    /// Remove records according to `mode`.
    ///
    /// `tags` is ignored by `All` and `Old`. For the tag modes the result is
    /// the AND of every individual removal.
    pub fn clean<S: AsRef<str>>(&mut self, mode: CleanMode, tags: &[S]) -> Result<bool, Error> {
        let result = match mode {
            CleanMode::All => self.clean_all()?,
            CleanMode::Old => self.clean_old()?,
            CleanMode::MatchingTag => {
                let ids = self.get_ids_matching_tags(tags)?;
                self.remove_each(&ids)?
            }
            CleanMode::NotMatchingTag => {
                let ids = self.get_ids_not_matching_tags(tags)?;
                self.remove_each(&ids)?
            }
            CleanMode::MatchingAnyTag => {
                let ids = self.get_ids_matching_any_tags(tags)?;
                self.remove_each(&ids)?
            }
        };
        tracing::debug!(mode = %mode, result, "cleaned cache");
        Ok(result)
    }

    /// Like [`clean`](Self::clean) with the mode given by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCleanMode` for anything but the five mode names.
    pub fn clean_named<S: AsRef<str>>(&mut self, mode: &str, tags: &[S]) -> Result<bool, Error> {
        let mode = mode.parse()?;
        self.clean(mode, tags)
    }

    fn clean_all(&mut self) -> Result<bool, Error> {
        let conn = self.db.ready()?;
        let records = conn.execute("DELETE FROM cache", []).map(|_| true).or_warn("clean.all.records", false);
        let tags = conn.execute("DELETE FROM tag", []).map(|_| true).or_warn("clean.all.tags", false);
        self.vacuum.after_removal(conn);
        Ok(records && tags)
    }

    fn clean_old(&mut self) -> Result<bool, Error> {
        let now = self.clock.now();
        let conn = self.db.ready()?;
        let tags = conn
            .execute(
                "DELETE FROM tag WHERE id IN (SELECT id FROM cache WHERE expire > 0 AND expire <= ?1)",
                params![now],
            )
            .map(|_| true)
            .or_warn("clean.old.tags", false);
        let records = conn
            .execute("DELETE FROM cache WHERE expire > 0 AND expire <= ?1", params![now])
            .map(|_| true)
            .or_warn("clean.old.records", false);
        self.vacuum.after_removal(conn);
        Ok(tags && records)
    }

    fn remove_each(&mut self, ids: &[String]) -> Result<bool, Error> {
        let mut result = true;
        for id in ids {
            result = self.remove(id)? && result;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::vacuum::VacuumDraw;
    use crate::cache::ManualClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    const T0: i64 = 1_700_000_000;
    const NO_TAGS: &[&str] = &[];

    /// Counts draws and never asks for a vacuum.
    struct CountingDraw(Arc<AtomicU32>);

    impl VacuumDraw for CountingDraw {
        fn draw(&mut self, upper: u32) -> u32 {
            self.0.fetch_add(1, Ordering::SeqCst);
            upper
        }
    }

    fn backend() -> (SqliteBackend, ManualClock) {
        let clock = ManualClock::new(T0);
        let backend = SqliteBackend::open_in_memory().with_clock(clock.clone()).with_vacuum_factor(0);
        (backend, clock)
    }

    fn sorted(mut ids: Vec<String>) -> Vec<String> {
        ids.sort();
        ids
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("all".parse::<CleanMode>().unwrap(), CleanMode::All);
        assert_eq!("matching-any-tag".parse::<CleanMode>().unwrap(), CleanMode::MatchingAnyTag);
        assert_eq!("NOT_MATCHING_TAG".parse::<CleanMode>().unwrap(), CleanMode::NotMatchingTag);
        for mode in CleanMode::ALL_MODES {
            assert_eq!(mode.to_string().parse::<CleanMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unknown_mode_fails() {
        let (mut db, _) = backend();
        let result = db.clean_named("everything", NO_TAGS);
        assert!(matches!(result, Err(Error::UnknownCleanMode(name)) if name == "everything"));
    }

    #[test]
    fn test_clean_all() {
        let (mut db, _) = backend();
        db.save("a", b"1", &["t1"], None).unwrap();
        db.save("b", b"2", &["t2"], Some(60)).unwrap();

        assert!(db.clean(CleanMode::All, NO_TAGS).unwrap());
        assert!(db.get_ids().unwrap().is_empty());
        assert!(db.get_tags().unwrap().is_empty());
    }

    #[test]
    fn test_clean_old() {
        let (mut db, clock) = backend();
        db.save("forever", b"1", &["keep"], None).unwrap();
        db.save("fresh", b"2", &["keep"], Some(1_000)).unwrap();
        db.save("stale", b"3", &["gone"], Some(10)).unwrap();
        clock.advance(10);

        assert!(db.clean(CleanMode::Old, NO_TAGS).unwrap());

        assert!(db.load("stale", true).unwrap().is_none());
        assert_eq!(sorted(db.get_ids().unwrap()), vec!["forever", "fresh"]);
        assert_eq!(db.get_tags().unwrap(), vec!["keep"]);
        assert_eq!(db.get_metadatas("fresh").unwrap().unwrap().tags, vec!["keep"]);
    }

    #[test]
    fn test_clean_by_tags() {
        let (mut db, _) = backend();
        let seed = |db: &mut SqliteBackend| {
            db.clean(CleanMode::All, NO_TAGS).unwrap();
            db.save("a", b"1", &["t1", "t2"], None).unwrap();
            db.save("b", b"2", &["t1"], None).unwrap();
            db.save("c", b"3", &["t2"], None).unwrap();
        };

        seed(&mut db);
        assert!(db.clean(CleanMode::MatchingTag, &["t1", "t2"]).unwrap());
        assert_eq!(sorted(db.get_ids().unwrap()), vec!["b", "c"]);

        seed(&mut db);
        assert!(db.clean(CleanMode::MatchingAnyTag, &["t1"]).unwrap());
        assert_eq!(db.get_ids().unwrap(), vec!["c"]);

        seed(&mut db);
        assert!(db.clean(CleanMode::NotMatchingTag, &["t1"]).unwrap());
        assert_eq!(sorted(db.get_ids().unwrap()), vec!["a", "b"]);
        assert_eq!(sorted(db.get_tags().unwrap()), vec!["t1", "t2"]);
    }

    #[test]
    fn test_clean_by_tag_with_no_match_succeeds() {
        let (mut db, _) = backend();
        db.save("a", b"1", &["t1"], None).unwrap();
        assert!(db.clean(CleanMode::MatchingTag, &["nope"]).unwrap());
        assert_eq!(db.get_ids().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_stale_tag_makes_tag_clean_report_failure() {
        let (mut db, _) = backend();
        db.save("a", b"1", &["t1"], None).unwrap();
        let conn = db.db.ready().unwrap();
        conn.execute("INSERT INTO tag (name, id) VALUES ('t1', 'ghost')", []).unwrap();

        // The ghost id has no record row, so its removal reports false.
        assert!(!db.clean(CleanMode::MatchingTag, &["t1"]).unwrap());
        assert!(db.get_ids().unwrap().is_empty());
        assert!(db.get_tags().unwrap().is_empty());
    }

    #[test]
    fn test_vacuum_rolls_per_removal_for_tag_modes() {
        let draws = Arc::new(AtomicU32::new(0));
        let (db, _) = backend();
        let mut db = db.with_vacuum_factor(5).with_vacuum_draw(CountingDraw(draws.clone()));
        for id in ["a", "b", "c"] {
            db.save(id, b"x", &["t"], None).unwrap();
        }

        db.clean(CleanMode::MatchingTag, &["t"]).unwrap();
        assert_eq!(draws.load(Ordering::SeqCst), 3);

        for id in ["a", "b", "c"] {
            db.save(id, b"x", &["t"], None).unwrap();
        }
        db.clean(CleanMode::All, NO_TAGS).unwrap();
        assert_eq!(draws.load(Ordering::SeqCst), 4);

        db.clean(CleanMode::Old, NO_TAGS).unwrap();
        assert_eq!(draws.load(Ordering::SeqCst), 5);
    }
}

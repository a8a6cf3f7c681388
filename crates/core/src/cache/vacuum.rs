//! Probabilistic VACUUM scheduling.
//!
//! VACUUM rewrites the whole database file, so instead of running it after
//! every removal it runs with probability `1 / factor`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;

/// Source of the uniform draw that decides whether to compact.
pub trait VacuumDraw: Send {
    /// Return an integer in `1..=upper`.
    fn draw(&mut self, upper: u32) -> u32;
}

/// Uniform draws from a seeded or entropy-backed PRNG.
#[derive(Debug, Clone)]
pub struct RandomDraw {
    rng: StdRng,
}

impl RandomDraw {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomDraw {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl VacuumDraw for RandomDraw {
    fn draw(&mut self, upper: u32) -> u32 {
        self.rng.gen_range(1..=upper)
    }
}

/// Decides after each removal whether to compact the database.
///
/// - factor 0: never
/// - factor 1: always
/// - factor N: when a draw from `1..=N` comes up 1
pub struct VacuumScheduler {
    factor: u32,
    draw: Box<dyn VacuumDraw>,
}

impl std::fmt::Debug for VacuumScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VacuumScheduler").field("factor", &self.factor).finish_non_exhaustive()
    }
}

impl VacuumScheduler {
    pub fn new(factor: u32) -> Self {
        Self::with_draw(factor, RandomDraw::from_entropy())
    }

    pub fn with_draw(factor: u32, draw: impl VacuumDraw + 'static) -> Self {
        Self { factor, draw: Box::new(draw) }
    }

    pub(crate) fn set_factor(&mut self, factor: u32) {
        self.factor = factor;
    }

    pub(crate) fn set_draw(&mut self, draw: impl VacuumDraw + 'static) {
        self.draw = Box::new(draw);
    }

    /// Roll for a compaction.
    pub fn should_vacuum(&mut self) -> bool {
        match self.factor {
            0 => false,
            1 => true,
            factor => self.draw.draw(factor) == 1,
        }
    }

    /// Called after a removal or clean; runs VACUUM when the roll says so.
    ///
    /// Returns whether VACUUM ran successfully. A failure is only logged.
    pub(crate) fn after_removal(&mut self, conn: &Connection) -> bool {
        if !self.should_vacuum() {
            return false;
        }

        match conn.execute_batch("VACUUM") {
            Ok(()) => {
                tracing::debug!(factor = self.factor, "vacuumed cache database");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "automatic VACUUM failed");
                false
            }
        }
    }
}

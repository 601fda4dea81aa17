//! Random-source seam.
//!
//! Every random draw in the crate (pool picks, shuffles, counts, jitter
//! durations) goes through [`RandomSource`], so a run can be made
//! reproducible by seeding and tests can script exact outcomes.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, upper)`. Returns 0 when `upper <= 1`.
    fn roll(&self, upper: usize) -> usize;
}

/// [`RandomSource`] backed by a [`StdRng`], shareable across tasks.
pub struct SeededRandom {
    inner: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn roll(&self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        let mut rng = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..upper)
    }
}

/// Uniform draw in `[lo, hi]` (inclusive). Returns `lo` when `hi <= lo`.
pub fn range_inclusive(rng: &dyn RandomSource, lo: usize, hi: usize) -> usize {
    if hi <= lo {
        return lo;
    }
    lo + rng.roll(hi - lo + 1)
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T>(rng: &dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        items.swap(i, rng.roll(i + 1));
    }
}

/// Random delay in `[lo_ms, hi_ms]` milliseconds.
pub fn jitter(rng: &dyn RandomSource, lo_ms: u64, hi_ms: u64) -> Duration {
    Duration::from_millis(range_inclusive(rng, lo_ms as usize, hi_ms as usize) as u64)
}

/// Scripted source for tests: replays a fixed roll sequence, then zeros.
#[cfg(test)]
pub struct ScriptedRandom {
    rolls: Mutex<std::collections::VecDeque<usize>>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(rolls: &[usize]) -> Self {
        Self {
            rolls: Mutex::new(rolls.iter().copied().collect()),
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn roll(&self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        let mut rolls = self.rolls.lock().unwrap();
        rolls.pop_front().unwrap_or(0).min(upper - 1)
    }
}

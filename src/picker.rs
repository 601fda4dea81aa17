//! Bounded non-repetition of selected content.
//!
//! Top-level posts avoid the last few accepted texts; replies avoid exact
//! repeats within one message's thread. Both selections retry a bounded
//! number of times and then accept a repeat rather than loop forever, so a
//! small pool can never starve a run.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::content::ContentPool;
use crate::model::MessageId;
use crate::rng::RandomSource;

/// How many recently accepted top-level texts are rejected on re-pick.
pub const RECENT_WINDOW: usize = 5;

const TOP_LEVEL_ATTEMPTS: usize = 10;
const PER_TARGET_ATTEMPTS: usize = 20;

/// Per-run selection state, owned by the engine and passed by reference so
/// independent runs never share scratch state.
#[derive(Debug, Default)]
pub struct UsageTracker {
    recent: VecDeque<String>,
    used_replies: HashMap<MessageId, HashSet<String>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a top-level text, avoiding the recent-window when possible.
    ///
    /// Samples up to `TOP_LEVEL_ATTEMPTS` times; the final sample is accepted
    /// even if it repeats. The accepted value always enters the window.
    pub fn pick_top_level(&mut self, pool: &ContentPool, rng: &dyn RandomSource) -> String {
        let mut candidate = pool.pick(rng).to_string();
        for _ in 1..TOP_LEVEL_ATTEMPTS {
            if !self.recent.contains(&candidate) {
                break;
            }
            candidate = pool.pick(rng).to_string();
        }

        self.recent.push_back(candidate.clone());
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        candidate
    }

    /// Pick a reply text for one message's thread, avoiding texts already
    /// used under that message.
    ///
    /// Samples up to `PER_TARGET_ATTEMPTS` times; the accepted value is
    /// recorded in the used-set even when it is a repeat, so later retry
    /// streaks still trend toward novelty.
    pub fn pick_reply(
        &mut self,
        pool: &ContentPool,
        rng: &dyn RandomSource,
        parent: &MessageId,
    ) -> String {
        let used = self.used_replies.entry(parent.clone()).or_default();

        let mut candidate = pool.pick(rng).to_string();
        for _ in 1..PER_TARGET_ATTEMPTS {
            if !used.contains(&candidate) {
                break;
            }
            candidate = pool.pick(rng).to_string();
        }

        used.insert(candidate.clone());
        candidate
    }

    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    pub fn replies_used_for(&self, parent: &MessageId) -> usize {
        self.used_replies.get(parent).map_or(0, HashSet::len)
    }
}

//! Bounded FIFO history of completed turns.
//!
//! Holds at most `max_turns` entries; appending beyond that evicts the
//! oldest. Disabling history hides the stored turns from [`HistoryStore::read`]
//! without discarding them, so toggling twice restores the prior contents.

use localseek_core::Turn;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    turns: VecDeque<Turn>,
    max_turns: usize,
    enabled: bool,
}

impl HistoryStore {
    pub fn new(max_turns: usize, enabled: bool) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns),
            max_turns,
            enabled,
        }
    }

    /// Record a completed turn, evicting the oldest when full.
    ///
    /// Turns are recorded even while history is disabled.
    pub fn append(&mut self, turn: Turn) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
        debug!(stored = self.turns.len(), "History appended");
    }

    /// Drop every stored turn. The enabled flag is unchanged.
    pub fn clear(&mut self) {
        self.turns.clear();
        debug!("History cleared");
    }

    /// Flip the enabled flag and return the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        debug!(enabled = self.enabled, "History toggled");
        self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns visible to prompt assembly, oldest first. Empty when disabled.
    pub fn read(&self) -> Vec<Turn> {
        if !self.enabled {
            return Vec::new();
        }
        self.turns.iter().cloned().collect()
    }

    /// Stored turns regardless of the enabled flag.
    pub fn stored(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(3, true)
    }
}

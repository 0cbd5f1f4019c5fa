//! Per-session counters reported with the terminal outcome.

use serde::Serialize;

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Generations computed (including ones with no visible change)
    pub generations: u64,
    /// Non-empty batches handed to the consumer
    pub batches_emitted: u64,
    /// Total cell changes across all generations
    pub cells_changed: u64,
    /// Largest active set seen between generations
    pub peak_active: usize,
}

impl SessionStats {
    /// Records one generation's outcome.
    pub fn record_generation(&mut self, changed: usize, active: usize) {
        self.generations += 1;
        self.cells_changed += changed as u64;
        self.peak_active = self.peak_active.max(active);
    }

    /// Records a delivered batch.
    pub fn record_emission(&mut self) {
        self.batches_emitted += 1;
    }
}

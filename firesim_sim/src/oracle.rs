//! Replay oracle for session streams.
//!
//! The oracle keeps its own mirror of the grid, rebuilt purely from the
//! emitted diffs, and checks every change against the transition rule:
//! - Tree → Burning/0 only next to a cell that is still burning this tick
//! - Burning/k → Burning/k+1 while `k+1 <= burnTime`
//! - Burning/k → Empty/0 exactly when `k+1 > burnTime`
//! - Empty never changes again
//! - every burning cell shows up in every batch
//! - the terminal marker only arrives once nothing burns

use firesim_core::neighbors::MOORE_OFFSETS;
use firesim_core::{Cell, CellState, Coord, DiffBatch, Grid, StreamEvent};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// A rule the stream broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("generation {generation}: {coord} is not part of the grid")]
    UnknownCell { generation: u64, coord: Coord },

    #[error("generation {generation}: {coord} went from {from:?}/{from_burn} to {to:?}/{to_burn}")]
    IllegalTransition {
        generation: u64,
        coord: Coord,
        from: CellState,
        from_burn: u32,
        to: CellState,
        to_burn: u32,
    },

    #[error("generation {generation}: {coord} ignited with no burning neighbor")]
    SpontaneousIgnition { generation: u64, coord: Coord },

    #[error("generation {generation}: burning cell {coord} missing from batch")]
    SkippedBurnTick { generation: u64, coord: Coord },

    #[error("terminal marker while {burning} cells still burn")]
    PrematureEnd { burning: usize },

    #[error("event after the terminal marker")]
    EventAfterEnd,
}

/// Mirrors a grid from its diff stream and validates every step.
pub struct ReplayOracle {
    /// Mirror of the session's grid
    cells: HashMap<Coord, Cell>,

    /// Coordinates currently burning in the mirror
    burning: BTreeSet<Coord>,

    /// Burn threshold of the session under test
    burn_time: u32,

    /// Batches applied so far
    generations: u64,

    /// Whether the terminal marker was seen
    ended: bool,

    /// Every violation found
    violations: Vec<Violation>,
}

impl ReplayOracle {
    /// Starts from the session's initial grid.
    pub fn new(grid: &Grid, burn_time: u32) -> Self {
        let cells: HashMap<Coord, Cell> = grid.cells().iter().map(|c| (c.coord(), *c)).collect();
        let burning = grid
            .cells()
            .iter()
            .filter(|c| c.is_burning())
            .map(Cell::coord)
            .collect();

        Self {
            cells,
            burning,
            burn_time,
            generations: 0,
            ended: false,
            violations: Vec::new(),
        }
    }

    /// Applies one stream event.
    pub fn apply(&mut self, event: &StreamEvent) {
        if self.ended {
            self.violations.push(Violation::EventAfterEnd);
            return;
        }

        match event {
            StreamEvent::Batch(batch) => self.apply_batch(batch),
            StreamEvent::End => {
                self.ended = true;
                if !self.burning.is_empty() {
                    self.violations.push(Violation::PrematureEnd {
                        burning: self.burning.len(),
                    });
                }
            }
        }
    }

    fn apply_batch(&mut self, batch: &DiffBatch) {
        self.generations += 1;
        let generation = self.generations;

        for coord in &self.burning {
            if batch.get(*coord).is_none() {
                self.violations.push(Violation::SkippedBurnTick {
                    generation,
                    coord: *coord,
                });
            }
        }

        // Cells still burning after this tick, as seen by the ignition check
        let still_burning: BTreeSet<Coord> = self
            .burning
            .iter()
            .copied()
            .filter(|coord| batch.get(*coord).map_or(true, Cell::is_burning))
            .collect();

        for next in batch.cells() {
            let coord = next.coord();
            let Some(prev) = self.cells.get(&coord).copied() else {
                self.violations.push(Violation::UnknownCell { generation, coord });
                continue;
            };

            // Widened so a counter at u32::MAX still has a successor
            let aged = u64::from(prev.burn_time) + 1;
            let legal = match (prev.state, next.state) {
                (CellState::Tree, CellState::Burning) => next.burn_time == 0,
                (CellState::Burning, CellState::Burning) => {
                    u64::from(next.burn_time) == aged && next.burn_time <= self.burn_time
                }
                (CellState::Burning, CellState::Empty) => {
                    next.burn_time == 0 && aged > u64::from(self.burn_time)
                }
                _ => false,
            };

            if !legal {
                self.violations.push(Violation::IllegalTransition {
                    generation,
                    coord,
                    from: prev.state,
                    from_burn: prev.burn_time,
                    to: next.state,
                    to_burn: next.burn_time,
                });
            } else if prev.state == CellState::Tree && !has_burning_neighbor(&still_burning, coord) {
                self.violations.push(Violation::SpontaneousIgnition { generation, coord });
            }

            self.cells.insert(coord, *next);
            if next.is_burning() {
                self.burning.insert(coord);
            } else {
                self.burning.remove(&coord);
            }
        }
    }

    pub fn generations(&self) -> u64 {
        self.generations
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of mirror cells in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.values().filter(|c| c.state == state).count()
    }

    /// Mirror cell at `coord`.
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }
}

fn has_burning_neighbor(burning: &BTreeSet<Coord>, coord: Coord) -> bool {
    MOORE_OFFSETS.iter().any(|&(dx, dy)| {
        match (coord.x.checked_add(dx), coord.y.checked_add(dy)) {
            (Some(x), Some(y)) => burning.contains(&Coord::new(x, y)),
            _ => false,
        }
    })
}

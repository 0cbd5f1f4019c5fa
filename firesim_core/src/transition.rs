//! Transition Engine - advances a grid by one generation.
//!
//! # Algorithm
//!
//! Strictly two-phase, so no cell both ages and newly ignites in the same
//! tick:
//!
//! ```text
//! Phase 1 (snapshot of active set)      Phase 2 (candidate set)
//! ┌──────────────────────────────┐      ┌────────────────────────────┐
//! │ burnTime += 1                │      │ one draw per candidate      │
//! │ > threshold → Empty, remove  │ ───► │ success → Burning/0, add    │
//! │ else → record, collect Tree  │      │ failure → unchanged         │
//! │        neighbors (deduped)   │      └────────────────────────────┘
//! └──────────────────────────────┘
//! ```
//!
//! Ignition probability is evaluated once per candidate cell, regardless of
//! how many burning neighbors it has.

use crate::error::FireError;
use crate::grid::{ActiveSet, Cell, Coord, Grid};
use crate::neighbors::neighbors;
use crate::params::Parameters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cells changed by one generation, keyed by coordinate.
///
/// Holds owned copies: nothing here aliases grid storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffBatch {
    #[serde(rename = "updatedCellsMap")]
    cells: BTreeMap<Coord, Cell>,
}

impl DiffBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the new value of a cell.
    pub fn insert(&mut self, cell: Cell) {
        self.cells.insert(cell.coord(), cell);
    }

    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Changed cells in coordinate order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values()
    }
}

/// Computes one generation in place.
///
/// Mutates `grid` and `active`, and returns the changed cells. An empty
/// batch means nothing observable happened this tick.
///
/// # Errors
///
/// `StreamingFailure` if `active` names a position outside the grid.
pub fn step<R: Rng + ?Sized>(
    grid: &mut Grid,
    params: &Parameters,
    active: &mut ActiveSet,
    rng: &mut R,
) -> Result<DiffBatch, FireError> {
    let mut changed = DiffBatch::new();
    let mut candidates = BTreeSet::new();

    // Phase 1: age or extinguish every currently burning cell
    let snapshot: Vec<usize> = active.iter().copied().collect();
    for position in snapshot {
        let cell = *grid.cell(position).ok_or_else(|| {
            FireError::streaming(format!(
                "active position {} outside grid of {} cells",
                position,
                grid.len()
            ))
        })?;

        // A counter that cannot advance is past any threshold
        let burnt_out = cell
            .burn_time
            .checked_add(1)
            .map_or(true, |next| next > params.burn_time);
        if burnt_out {
            let burnt = cell.extinguished();
            grid.replace(position, burnt);
            active.remove(&position);
            changed.insert(burnt);
        } else {
            let aged = cell.aged();
            grid.replace(position, aged);
            changed.insert(aged);

            for neighbor in neighbors(grid.index(), &cell) {
                if grid.cell(neighbor).is_some_and(Cell::is_tree) {
                    candidates.insert(neighbor);
                }
            }
        }
    }

    // Phase 2: one ignition trial per candidate
    for position in candidates {
        if rng.gen::<f64>() < params.p_burn {
            if let Some(cell) = grid.cell(position).copied() {
                let lit = cell.ignited();
                grid.replace(position, lit);
                active.insert(position);
                changed.insert(lit);
            }
        }
    }

    Ok(changed)
}

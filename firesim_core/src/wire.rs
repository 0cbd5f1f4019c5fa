//! Wire types exchanged with the transport layer.
//!
//! Session creation arrives as a sparse description of the initial field:
//! only non-Tree cells are listed, together with the full coordinate index
//! (`"x,y" → position`) and the grid dimensions. The core rebuilds the full
//! grid from it, filling every unlisted position with a fresh Tree.

use crate::error::FireError;
use crate::grid::{Cell, Coord, Grid};
use crate::params::Parameters;
use crate::session::StreamEvent;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Session creation payload.
///
/// All fields except `seed` are required; they are optional here so that a
/// missing field is reported as `InvalidInput` naming the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub non_tree_cells: Option<Vec<Cell>>,
    pub params: Option<Parameters>,
    pub coords: Option<BTreeMap<String, usize>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Fixes the ignition draws of the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl CreateSessionRequest {
    /// Parses a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, FireError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Describes an existing grid the way a client would submit it.
    pub fn from_grid(grid: &Grid, params: Parameters) -> Self {
        let coords = grid
            .index()
            .iter()
            .map(|(coord, position)| (coord.to_string(), position))
            .collect();

        Self {
            non_tree_cells: Some(grid.non_tree_cells()),
            params: Some(params),
            coords: Some(coords),
            width: Some(grid.width()),
            height: Some(grid.height()),
            seed: None,
        }
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the request and rebuilds the full grid.
    ///
    /// For every coordinate-index entry the cell is the listed non-Tree cell
    /// at that coordinate (first occurrence wins), else a Tree with
    /// burnTime 0.
    pub fn build_grid(&self) -> Result<Grid, FireError> {
        let non_tree = self
            .non_tree_cells
            .as_ref()
            .ok_or_else(|| FireError::missing("nonTreeCells"))?;
        let coords = self.coords.as_ref().ok_or_else(|| FireError::missing("coords"))?;
        let width = self
            .width
            .filter(|w| *w > 0)
            .ok_or_else(|| FireError::missing("width"))?;
        let height = self
            .height
            .filter(|h| *h > 0)
            .ok_or_else(|| FireError::missing("height"))?;

        let expected = u64::from(width) * u64::from(height);
        if coords.len() as u64 != expected {
            return Err(FireError::invalid(format!(
                "coordinate index has {} entries, expected {}x{} = {}",
                coords.len(),
                width,
                height,
                expected
            )));
        }

        let mut overrides: HashMap<Coord, Cell> = HashMap::with_capacity(non_tree.len());
        for cell in non_tree {
            overrides.entry(cell.coord()).or_insert(*cell);
        }

        let mut slots: Vec<Option<Cell>> = vec![None; coords.len()];
        for (key, &position) in coords {
            let coord: Coord = key.parse()?;
            let slot = slots.get_mut(position).ok_or_else(|| {
                FireError::invalid(format!(
                    "coordinate {} maps to position {} outside [0, {})",
                    coord, position, expected
                ))
            })?;
            if slot.is_some() {
                return Err(FireError::invalid(format!(
                    "position {} is claimed by more than one coordinate",
                    position
                )));
            }
            *slot = Some(
                overrides
                    .remove(&coord)
                    .unwrap_or_else(|| Cell::tree(coord.x, coord.y)),
            );
        }

        if let Some(stray) = overrides.keys().min() {
            return Err(FireError::invalid(format!(
                "non-tree cell at {} is not in the coordinate index",
                stray
            )));
        }

        // Every slot is filled: entry count matches and no position repeats
        let cells = slots
            .into_iter()
            .collect::<Option<Vec<Cell>>>()
            .ok_or_else(|| FireError::invalid("coordinate index leaves positions unfilled"))?;

        Grid::from_cells(cells, width, height)
    }

    /// Validates the request and splits it into grid, parameters and seed.
    pub fn into_parts(self) -> Result<(Grid, Parameters, Option<u64>), FireError> {
        let grid = self.build_grid()?;
        let params = self.params.ok_or_else(|| FireError::missing("params"))?;
        params.validate()?;
        Ok((grid, params, self.seed))
    }
}

/// Session creation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: firesim_env::SessionId,
}

impl Serialize for StreamEvent {
    /// A batch is `{"updatedCellsMap": {...}}`, the terminal marker is `{}`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StreamEvent::Batch(batch) => batch.serialize(serializer),
            StreamEvent::End => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

//! Grid Model - cells, coordinates and the coordinate index.
//!
//! A [`Grid`] is a fixed-length sequence of [`Cell`]s plus a coordinate
//! index mapping `(x, y)` to the cell's position in that sequence. The index
//! is a bijection onto `[0, width * height)`, built once at construction.
//! Cell *contents* change from generation to generation, cell *positions*
//! never do.

use crate::error::FireError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Positions of every cell currently in the Burning state.
///
/// Ordered so that iteration (and therefore the order in which ignition
/// draws are consumed) is reproducible under a fixed seed.
pub type ActiveSet = BTreeSet<usize>;

/// Fire state of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Unburnt fuel
    #[serde(rename = "T")]
    Tree,

    /// On fire
    #[serde(rename = "B")]
    Burning,

    /// Burnt out
    #[serde(rename = "E")]
    Empty,
}

/// Integer grid coordinate.
///
/// Serialized as the `"x,y"` string key used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = FireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| FireError::invalid(format!("malformed coordinate key `{}`", s)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| FireError::invalid(format!("malformed coordinate key `{}`", s)))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// One grid position with its fire state and burn-duration counter.
///
/// Transitions produce a new value; nothing mutates a cell partially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub state: CellState,
    pub x: i32,
    pub y: i32,
    /// Ticks spent burning
    #[serde(default)]
    pub burn_time: u32,
}

impl Cell {
    /// A fresh tree at `(x, y)`.
    pub fn tree(x: i32, y: i32) -> Self {
        Self {
            state: CellState::Tree,
            x,
            y,
            burn_time: 0,
        }
    }

    /// A freshly ignited cell at `(x, y)`.
    pub fn burning(x: i32, y: i32) -> Self {
        Self {
            state: CellState::Burning,
            ..Self::tree(x, y)
        }
    }

    /// A burnt-out cell at `(x, y)`.
    pub fn empty(x: i32, y: i32) -> Self {
        Self {
            state: CellState::Empty,
            ..Self::tree(x, y)
        }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn is_burning(&self) -> bool {
        self.state == CellState::Burning
    }

    pub fn is_tree(&self) -> bool {
        self.state == CellState::Tree
    }

    /// This cell one tick further into its burn.
    pub fn aged(self) -> Self {
        Self {
            burn_time: self.burn_time.saturating_add(1),
            ..self
        }
    }

    /// This cell after ignition.
    pub fn ignited(self) -> Self {
        Self::burning(self.x, self.y)
    }

    /// This cell after burning out.
    pub fn extinguished(self) -> Self {
        Self::empty(self.x, self.y)
    }
}

/// Coordinate → position lookup for one grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordIndex {
    positions: HashMap<Coord, usize>,
}

impl CoordIndex {
    /// Returns the position of `coord`, if it is part of the grid.
    pub fn get(&self, coord: Coord) -> Option<usize> {
        self.positions.get(&coord).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, usize)> + '_ {
        self.positions.iter().map(|(coord, position)| (*coord, *position))
    }
}

/// The cell collection of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<Cell>,
    width: u32,
    height: u32,
    index: CoordIndex,
}

impl Grid {
    /// Builds a grid from a full, ordered cell list.
    ///
    /// Fails with `InvalidInput` if the dimensions are zero, the cell count is
    /// not `width * height`, or two cells share a coordinate.
    pub fn from_cells(cells: Vec<Cell>, width: u32, height: u32) -> Result<Self, FireError> {
        if width == 0 || height == 0 {
            return Err(FireError::invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let expected = u64::from(width) * u64::from(height);
        if cells.len() as u64 != expected {
            return Err(FireError::invalid(format!(
                "grid has {} cells, expected {}x{} = {}",
                cells.len(),
                width,
                height,
                expected
            )));
        }

        let mut positions = HashMap::with_capacity(cells.len());
        for (position, cell) in cells.iter().enumerate() {
            if positions.insert(cell.coord(), position).is_some() {
                return Err(FireError::invalid(format!(
                    "coordinate {} appears more than once",
                    cell.coord()
                )));
            }
        }

        Ok(Self {
            cells,
            width,
            height,
            index: CoordIndex { positions },
        })
    }

    /// Builds an all-Tree square field of side `side`, centered on the origin.
    ///
    /// Coordinates run from `-side/2` (inclusive) to `side/2 + side%2`
    /// (exclusive) on both axes, row by row.
    pub fn square(side: u32) -> Result<Self, FireError> {
        let signed = i32::try_from(side)
            .map_err(|_| FireError::invalid(format!("field side {} is too large", side)))?;
        let half = signed / 2;
        let start = -half;
        let end = half + signed % 2;

        let mut cells = Vec::with_capacity(side as usize * side as usize);
        for y in start..end {
            for x in start..end {
                cells.push(Cell::tree(x, y));
            }
        }

        Self::from_cells(cells, side, side)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells (`width * height`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, position: usize) -> Option<&Cell> {
        self.cells.get(position)
    }

    pub fn index(&self) -> &CoordIndex {
        &self.index
    }

    /// Position of `coord`, if it is part of the grid.
    pub fn position(&self, coord: Coord) -> Option<usize> {
        self.index.get(coord)
    }

    /// Cell at `coord`, if it is part of the grid.
    pub fn cell_at(&self, coord: Coord) -> Option<&Cell> {
        self.position(coord).and_then(|position| self.cells.get(position))
    }

    /// Writes a new value into an existing position.
    ///
    /// The replacement must keep the position's coordinate.
    pub(crate) fn replace(&mut self, position: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(position) {
            debug_assert_eq!(slot.coord(), cell.coord());
            *slot = cell;
        }
    }

    /// Overwrites the cell at `coord` (used to paint initial fields).
    pub fn paint(&mut self, coord: Coord, state: CellState) -> Result<(), FireError> {
        let position = self
            .position(coord)
            .ok_or_else(|| FireError::invalid(format!("coordinate {} is outside the grid", coord)))?;
        let cell = Cell {
            state,
            x: coord.x,
            y: coord.y,
            burn_time: 0,
        };
        self.replace(position, cell);
        Ok(())
    }

    /// Scans the whole grid for burning cells.
    ///
    /// This is the only full-grid pass a session performs.
    pub fn burning_positions(&self) -> ActiveSet {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_burning())
            .map(|(position, _)| position)
            .collect()
    }

    /// Every cell that is not a plain Tree, in position order.
    pub fn non_tree_cells(&self) -> Vec<Cell> {
        self.cells.iter().filter(|cell| !cell.is_tree()).copied().collect()
    }

    /// Number of cells in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|cell| cell.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_square_three_is_centered() {
        let grid = Grid::square(3).unwrap();

        assert_eq!(grid.len(), 9);
        assert_eq!(grid.cells()[0].coord(), Coord::new(-1, -1));
        assert_eq!(grid.cells()[8].coord(), Coord::new(1, 1));
        assert_eq!(grid.position(Coord::new(0, 0)), Some(4));
        assert_eq!(grid.position(Coord::new(2, 0)), None);
    }

    #[test]
    fn test_square_even_side_is_shifted_negative() {
        let grid = Grid::square(4).unwrap();

        assert_eq!(grid.cells()[0].coord(), Coord::new(-2, -2));
        assert_eq!(grid.cells()[15].coord(), Coord::new(1, 1));
    }

    #[test]
    fn test_from_cells_rejects_wrong_count() {
        let cells = vec![Cell::tree(0, 0), Cell::tree(1, 0)];
        let err = Grid::from_cells(cells, 2, 2).unwrap_err();
        assert!(matches!(err, FireError::InvalidInput(_)));
    }

    #[test]
    fn test_from_cells_rejects_duplicate_coordinates() {
        let cells = vec![Cell::tree(0, 0), Cell::tree(0, 0)];
        assert!(Grid::from_cells(cells, 2, 1).is_err());
    }

    #[test]
    fn test_from_cells_rejects_zero_dimensions() {
        assert!(Grid::from_cells(Vec::new(), 0, 0).is_err());
        assert!(Grid::square(0).is_err());
    }

    #[test]
    fn test_burning_positions_scan() {
        let mut grid = Grid::square(3).unwrap();
        grid.paint(Coord::new(0, 0), CellState::Burning).unwrap();
        grid.paint(Coord::new(1, 1), CellState::Burning).unwrap();
        grid.paint(Coord::new(-1, 1), CellState::Empty).unwrap();

        let active: Vec<usize> = grid.burning_positions().into_iter().collect();
        assert_eq!(active, vec![4, 8]);
        assert_eq!(grid.non_tree_cells().len(), 3);
        assert_eq!(grid.count(CellState::Tree), 6);
    }

    #[test]
    fn test_paint_outside_grid_fails() {
        let mut grid = Grid::square(3).unwrap();
        assert!(grid.paint(Coord::new(5, 5), CellState::Burning).is_err());
    }

    #[test]
    fn test_coord_key_parsing() {
        assert_eq!("3,-4".parse::<Coord>().unwrap(), Coord::new(3, -4));
        assert_eq!(Coord::new(-1, 2).to_string(), "-1,2");
        assert!("3;4".parse::<Coord>().is_err());
        assert!("a,4".parse::<Coord>().is_err());
    }

    #[test]
    fn test_cell_wire_shape() {
        let json = serde_json::to_value(Cell::burning(2, -3).aged()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "B", "x": 2, "y": -3, "burnTime": 1})
        );

        let parsed: Cell = serde_json::from_str(r#"{"state":"E","x":0,"y":1}"#).unwrap();
        assert_eq!(parsed, Cell::empty(0, 1));
    }

    proptest! {
        #[test]
        fn prop_index_is_bijection(side in 1u32..24) {
            let grid = Grid::square(side).unwrap();

            prop_assert_eq!(grid.index().len(), (side * side) as usize);
            for (position, cell) in grid.cells().iter().enumerate() {
                prop_assert_eq!(grid.position(cell.coord()), Some(position));
            }
        }
    }
}

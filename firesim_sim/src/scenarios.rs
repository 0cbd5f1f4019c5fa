//! Ignition scenarios: initial fields for harness runs.

use firesim_core::{CellState, Coord, FireError, Grid};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// A single spark in the middle of the field
    CenterSpark,

    /// One spark in each corner
    Corners,

    /// The whole leftmost column on fire
    LineFront,

    /// About 1% of the field lit at seeded random positions
    Scattered,

    /// Spark on the left edge, a full column of bare ground through x = 0
    Firebreak,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::CenterSpark,
            ScenarioId::Corners,
            ScenarioId::LineFront,
            ScenarioId::Scattered,
            ScenarioId::Firebreak,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CenterSpark => "center_spark",
            ScenarioId::Corners => "corners",
            ScenarioId::LineFront => "line_front",
            ScenarioId::Scattered => "scattered",
            ScenarioId::Firebreak => "firebreak",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CenterSpark => "Single spark at the origin spreading outward",
            ScenarioId::Corners => "Four sparks converging from the corners",
            ScenarioId::LineFront => "Straight fire front advancing from the left edge",
            ScenarioId::Scattered => "Seeded random sparks across the field",
            ScenarioId::Firebreak => "Fire from the left edge must not cross a bare column",
        }
    }

    /// Builds the initial field for a square grid of side `side`.
    pub fn build(&self, side: u32, seed: u64) -> Result<Grid, FireError> {
        let mut grid = Grid::square(side)?;
        let (start, end) = bounds(&grid);

        match self {
            ScenarioId::CenterSpark => {
                grid.paint(Coord::new(0, 0), CellState::Burning)?;
            }
            ScenarioId::Corners => {
                for (x, y) in [(start, start), (end, start), (start, end), (end, end)] {
                    grid.paint(Coord::new(x, y), CellState::Burning)?;
                }
            }
            ScenarioId::LineFront => {
                for y in start..=end {
                    grid.paint(Coord::new(start, y), CellState::Burning)?;
                }
            }
            ScenarioId::Scattered => {
                let count = (grid.len() / 100).max(1);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let coords: Vec<Coord> = index::sample(&mut rng, grid.len(), count)
                    .into_iter()
                    .filter_map(|position| grid.cell(position).map(|c| c.coord()))
                    .collect();
                for coord in coords {
                    grid.paint(coord, CellState::Burning)?;
                }
            }
            ScenarioId::Firebreak => {
                for y in start..=end {
                    grid.paint(Coord::new(0, y), CellState::Empty)?;
                }
                grid.paint(Coord::new(start, 0), CellState::Burning)?;
            }
        }

        Ok(grid)
    }

    /// Whether a finished field satisfies this scenario's own expectation.
    ///
    /// `burnt_at` reports whether the cell at a coordinate ever caught fire.
    pub fn check(&self, burnt_at: impl Fn(Coord) -> bool, side: u32) -> Result<(), String> {
        match self {
            ScenarioId::Firebreak if side >= 3 => {
                let (start, end) = square_bounds(side);
                for y in start..=end {
                    for x in 1..=end {
                        if burnt_at(Coord::new(x, y)) {
                            return Err(format!("fire crossed the break at {}", Coord::new(x, y)));
                        }
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Inclusive coordinate bounds of a square grid built by `Grid::square`.
fn bounds(grid: &Grid) -> (i32, i32) {
    square_bounds(grid.width())
}

fn square_bounds(side: u32) -> (i32, i32) {
    let side = side as i32;
    let start = -(side / 2);
    (start, start + side - 1)
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center_spark" | "centerspark" | "center" => Ok(ScenarioId::CenterSpark),
            "corners" => Ok(ScenarioId::Corners),
            "line_front" | "linefront" | "line" => Ok(ScenarioId::LineFront),
            "scattered" | "random" => Ok(ScenarioId::Scattered),
            "firebreak" | "fire_break" => Ok(ScenarioId::Firebreak),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_spark_lights_one_cell() {
        let grid = ScenarioId::CenterSpark.build(9, 0).unwrap();
        assert_eq!(grid.count(CellState::Burning), 1);
        assert!(grid.cell_at(Coord::new(0, 0)).unwrap().is_burning());
    }

    #[test]
    fn test_corners_and_line_front() {
        assert_eq!(ScenarioId::Corners.build(6, 0).unwrap().count(CellState::Burning), 4);

        let line = ScenarioId::LineFront.build(6, 0).unwrap();
        assert_eq!(line.count(CellState::Burning), 6);
        assert!(line.cell_at(Coord::new(-3, 2)).unwrap().is_burning());
    }

    #[test]
    fn test_scattered_is_seeded() {
        let a = ScenarioId::Scattered.build(30, 5).unwrap();
        let b = ScenarioId::Scattered.build(30, 5).unwrap();
        let c = ScenarioId::Scattered.build(30, 6).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.count(CellState::Burning), 9);
    }

    #[test]
    fn test_firebreak_layout() {
        let grid = ScenarioId::Firebreak.build(7, 0).unwrap();
        assert_eq!(grid.count(CellState::Empty), 7);
        assert!(grid.cell_at(Coord::new(-3, 0)).unwrap().is_burning());

        assert!(ScenarioId::Firebreak.check(|_| false, 7).is_ok());
        assert!(ScenarioId::Firebreak
            .check(|c| c == Coord::new(2, 1), 7)
            .is_err());
    }

    #[test]
    fn test_parse_names() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>().unwrap(), scenario);
            assert!(!scenario.description().is_empty());
        }
        assert!("meteor".parse::<ScenarioId>().is_err());
    }
}

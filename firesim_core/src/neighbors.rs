//! Neighbor Resolver - Moore neighborhood lookup through the coordinate index.

use crate::grid::{Cell, Coord, CoordIndex};

/// The 8 Moore-neighborhood offsets, row by row, excluding `(0, 0)`.
pub const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Positions of the neighbors of `cell` that exist in the grid.
///
/// The grid is not toroidal: offsets that leave the grid (or overflow the
/// coordinate type) are skipped, which is a normal outcome.
pub fn neighbors<'a>(index: &'a CoordIndex, cell: &Cell) -> impl Iterator<Item = usize> + 'a {
    let (x, y) = (cell.x, cell.y);
    MOORE_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let nx = x.checked_add(dx)?;
        let ny = y.checked_add(dy)?;
        index.get(Coord::new(nx, ny))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn neighbor_count(grid: &Grid, coord: Coord) -> usize {
        let cell = grid.cell_at(coord).unwrap();
        neighbors(grid.index(), cell).count()
    }

    #[test]
    fn test_center_has_eight_neighbors() {
        let grid = Grid::square(3).unwrap();
        let cell = grid.cell_at(Coord::new(0, 0)).unwrap();

        let found: Vec<usize> = neighbors(grid.index(), cell).collect();
        assert_eq!(found, vec![0, 1, 2, 3, 5, 6, 7, 8]);
    }

    #[test]
    fn test_edges_and_corners_are_clipped() {
        let grid = Grid::square(3).unwrap();

        assert_eq!(neighbor_count(&grid, Coord::new(-1, -1)), 3);
        assert_eq!(neighbor_count(&grid, Coord::new(0, -1)), 5);
        assert_eq!(neighbor_count(&grid, Coord::new(1, 0)), 5);
    }

    #[test]
    fn test_single_cell_grid_has_no_neighbors() {
        let grid = Grid::square(1).unwrap();
        assert_eq!(neighbor_count(&grid, Coord::new(0, 0)), 0);
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let cells = vec![Cell::tree(i32::MAX, i32::MIN), Cell::tree(i32::MAX - 1, i32::MIN)];
        let grid = Grid::from_cells(cells, 2, 1).unwrap();

        assert_eq!(neighbor_count(&grid, Coord::new(i32::MAX, i32::MIN)), 1);
    }
}

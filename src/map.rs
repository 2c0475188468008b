use crate::types::Coordinate;
use std::collections::BTreeSet;

/// Static warehouse floor: dimensions plus the set of blocked cells.
///
/// Obstacles are fixed at construction; nothing mutates them afterwards.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: usize,
    cols: usize,
    obstacles: BTreeSet<Coordinate>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, obstacles: impl IntoIterator<Item = Coordinate>) -> Self {
        Self {
            rows,
            cols,
            obstacles: obstacles.into_iter().collect(),
        }
    }

    /// Grid without any obstacle.
    pub fn open(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols, [])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn obstacles(&self) -> &BTreeSet<Coordinate> {
        &self.obstacles
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    pub fn is_obstacle(&self, coord: Coordinate) -> bool {
        self.obstacles.contains(&coord)
    }

    /// False iff `coord` lies outside the grid or on an obstacle.
    pub fn is_passable(&self, coord: Coordinate) -> bool {
        self.contains(coord) && !self.is_obstacle(coord)
    }

    /// Passable cells one step away, in the order down, up, right, left.
    pub fn neighbors(&self, coord: Coordinate) -> Vec<Coordinate> {
        let Coordinate { row, col } = coord;
        let candidates = [
            Some(Coordinate::new(row + 1, col)),
            row.checked_sub(1).map(|r| Coordinate::new(r, col)),
            Some(Coordinate::new(row, col + 1)),
            col.checked_sub(1).map(|c| Coordinate::new(row, c)),
        ];

        candidates
            .into_iter()
            .flatten()
            .filter(|c| self.is_passable(*c))
            .collect()
    }

    /// Every passable cell in row-major order.
    pub fn passable_cells(&self) -> Vec<Coordinate> {
        let mut cells = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let coord = Coordinate::new(row, col);
                if !self.is_obstacle(coord) {
                    cells.push(coord);
                }
            }
        }
        cells
    }
}

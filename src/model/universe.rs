// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Universes: flat cell collections and rectangular lattices

use std::collections::BTreeSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::model::cell::Cell;

/// A repetition-structure node: either a set of cells or a lattice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Universe {
    Cells(CellUniverse),
    Lattice(RectLattice),
}

impl Universe {
    pub fn id(&self) -> u32 {
        match self {
            Universe::Cells(cells) => cells.id,
            Universe::Lattice(lattice) => lattice.id,
        }
    }
}

/// A universe holding plain cells, keyed by cell id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellUniverse {
    pub id: u32,
    pub cells: AHashMap<u32, Cell>,
}

impl CellUniverse {
    pub fn new(id: u32) -> Self {
        CellUniverse {
            id,
            cells: AHashMap::new(),
        }
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.insert(cell.id, cell);
    }
}

/// A rectangular lattice. Two-dimensional lattices carry two entries in
/// `pitch`, `lower_left` and `shape`; the grid is always stored in three
/// dimensions with a unit z extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectLattice {
    pub id: u32,
    pub pitch: Vec<f64>,
    pub lower_left: Vec<f64>,
    pub shape: Vec<usize>,
    pub grid: LatticeGrid,
    /// Universe applied outside the index window.
    pub outer: Option<u32>,
}

/// Universe ids of the lattice elements in increasing-coordinate order,
/// x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeGrid {
    dims: [usize; 3],
    data: Vec<u32>,
}

impl LatticeGrid {
    pub fn new(dims: [usize; 3], data: Vec<u32>) -> Self {
        debug_assert_eq!(dims[0] * dims[1] * dims[2], data.len());
        LatticeGrid { dims, data }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u32 {
        self.data[self.index(x, y, z)]
    }

    /// Reverse element order along one axis (0 = x, 1 = y, 2 = z).
    pub fn flip(&mut self, axis: usize) {
        let dims = self.dims;
        let mut flipped = self.data.clone();
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let mut source = [x, y, z];
                    source[axis] = dims[axis] - 1 - source[axis];
                    flipped[self.index(x, y, z)] = self.get(source[0], source[1], source[2]);
                }
            }
        }
        self.data = flipped;
    }

    /// Substitute every occurrence of one universe id.
    pub fn replace(&mut self, old: u32, new: u32) {
        for entry in &mut self.data {
            if *entry == old {
                *entry = new;
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.data.contains(&id)
    }

    /// Distinct universe ids in ascending order.
    pub fn distinct(&self) -> BTreeSet<u32> {
        self.data.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout_x_fastest() {
        let grid = LatticeGrid::new([2, 2, 1], vec![1, 2, 3, 4]);
        assert_eq!(grid.get(0, 0, 0), 1);
        assert_eq!(grid.get(1, 0, 0), 2);
        assert_eq!(grid.get(0, 1, 0), 3);
        assert_eq!(grid.get(1, 1, 0), 4);
    }

    #[test]
    fn test_grid_flip() {
        let mut grid = LatticeGrid::new([3, 1, 1], vec![1, 2, 3]);
        grid.flip(0);
        assert_eq!(grid.get(0, 0, 0), 3);
        assert_eq!(grid.get(2, 0, 0), 1);

        let mut square = LatticeGrid::new([2, 2, 1], vec![1, 2, 3, 4]);
        square.flip(1);
        assert_eq!(square.get(0, 0, 0), 3);
        assert_eq!(square.get(1, 1, 0), 2);
    }

    #[test]
    fn test_grid_replace_and_distinct() {
        let mut grid = LatticeGrid::new([2, 2, 1], vec![5, 6, 5, 7]);
        assert_eq!(
            grid.distinct().into_iter().collect::<Vec<_>>(),
            vec![5, 6, 7]
        );
        grid.replace(5, 9);
        assert!(!grid.contains(5));
        assert_eq!(grid.get(0, 0, 0), 9);
        assert_eq!(grid.get(0, 1, 0), 9);
        assert_eq!(grid.get(1, 0, 0), 6);
    }
}

//! Boolean occupancy grid over lattice indices
//!
//! The same type carries ground truth from the simulator and estimates
//! from the detector, so the two can be compared element by element.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean grid of shape `(n_i, n_j)`, `true` where a site holds at least one atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyMask {
    cells: Array2<bool>,
}

impl OccupancyMask {
    /// All-empty mask for a lattice of `(n_i, n_j)` sites
    pub fn empty(shape: (usize, usize)) -> Self {
        Self {
            cells: Array2::from_elem(shape, false),
        }
    }

    pub fn from_array(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn site_count(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<bool> {
        self.cells.get((i, j)).copied()
    }

    /// Mark a signed index as occupied.
    ///
    /// Returns `false` and leaves the mask untouched when the index lies
    /// outside the lattice.
    pub fn mark(&mut self, i: i64, j: i64) -> bool {
        if i < 0 || j < 0 {
            return false;
        }
        match self.cells.get_mut((i as usize, j as usize)) {
            Some(cell) => {
                *cell = true;
                true
            }
            None => false,
        }
    }

    pub fn set(&mut self, i: usize, j: usize, occupied: bool) -> bool {
        match self.cells.get_mut((i, j)) {
            Some(cell) => {
                *cell = occupied;
                true
            }
            None => false,
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    pub fn filling_fraction(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.occupied_count() as f64 / self.site_count() as f64
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.cells.view()
    }

    /// Occupied `(i, j)` indices in row-major order
    pub fn occupied_sites(&self) -> Vec<(usize, usize)> {
        self.cells
            .indexed_iter()
            .filter(|(_, c)| **c)
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Row-of-rows form used when masks are written next to shot batches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaskRecord {
    pub rows: Vec<Vec<bool>>,
}

impl From<&OccupancyMask> for MaskRecord {
    fn from(mask: &OccupancyMask) -> Self {
        Self {
            rows: mask
                .cells
                .outer_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }
}

impl fmt::Display for OccupancyMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.cells.outer_iter() {
            let line: String = row.iter().map(|c| if *c { '#' } else { '.' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

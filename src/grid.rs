//! 2D grid with a one-cell overlay halo.
//!
//! The core covers logical indices `[0, nr) × [0, nz)`; the halo extends
//! the range by one in each direction, so the full logical index space is
//! `[-1, nr] × [-1, nz]`. Deposits landing just outside the core stay in
//! the halo until seam reduction folds them into the neighbor tile.

use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};
use std::ops::AddAssign;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid3D<T> {
    data: Array2<T>,
    nr: usize,
    nz: usize,
}

impl<T: Copy> Grid3D<T> {
    pub fn new(nr: usize, nz: usize, init: T) -> Grid3D<T> {
        Grid3D {
            data: Array2::from_elem((nr + 2, nz + 2), init),
            nr,
            nz,
        }
    }

    pub fn nr(&self) -> usize {
        self.nr
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    fn storage_index(&self, i: isize, k: isize) -> (usize, usize) {
        debug_assert!(
            i >= -1 && i <= self.nr as isize && k >= -1 && k <= self.nz as isize,
            "grid index ({}, {}) outside [-1, {}] x [-1, {}]",
            i,
            k,
            self.nr,
            self.nz
        );
        ((i + 1) as usize, (k + 1) as usize)
    }

    pub fn get(&self, i: isize, k: isize) -> T {
        self.data[self.storage_index(i, k)]
    }

    pub fn set(&mut self, i: isize, k: isize, value: T) {
        let idx = self.storage_index(i, k);
        self.data[idx] = value;
    }

    /// Sets every element, core and halo.
    pub fn fill(&mut self, value: T) {
        for v in self.data.iter_mut() {
            *v = value;
        }
    }

    /// Sets only the halo strips, leaving the core untouched.
    pub fn overlay_set(&mut self, value: T) {
        let (rows, cols) = self.data.dim();
        for k in 0..cols {
            self.data[(0, k)] = value;
            self.data[(rows - 1, k)] = value;
        }
        for i in 0..rows {
            self.data[(i, 0)] = value;
            self.data[(i, cols - 1)] = value;
        }
    }
}

impl<T: Copy + AddAssign> Grid3D<T> {
    /// In-place increment. A core index adds to the core, an index one
    /// step outside adds to the halo.
    pub fn inc(&mut self, i: isize, k: isize, value: T) {
        let idx = self.storage_index(i, k);
        self.data[idx] += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_and_halo_addressing() {
        let mut g = Grid3D::new(4, 3, 0.0f64);

        g.set(0, 0, 1.);
        g.set(3, 2, 2.);
        g.set(-1, 0, 3.);
        g.set(4, 3, 4.);

        assert_eq!(g.get(0, 0), 1.);
        assert_eq!(g.get(3, 2), 2.);
        assert_eq!(g.get(-1, 0), 3.);
        assert_eq!(g.get(4, 3), 4.);
    }

    #[test]
    fn inc_accumulates_in_halo() {
        let mut g = Grid3D::new(2, 2, 0.0f64);

        g.inc(2, 0, 1.5);
        g.inc(2, 0, 1.5);
        g.inc(-1, -1, 1.);

        assert_eq!(g.get(2, 0), 3.);
        assert_eq!(g.get(-1, -1), 1.);
        assert_eq!(g.get(0, 0), 0.);
    }

    #[test]
    fn overlay_set_spares_the_core() {
        let mut g = Grid3D::new(2, 2, 7.0f64);

        g.overlay_set(0.);

        assert_eq!(g.get(0, 0), 7.);
        assert_eq!(g.get(1, 1), 7.);
        assert_eq!(g.get(-1, 0), 0.);
        assert_eq!(g.get(2, 2), 0.);
        assert_eq!(g.get(0, -1), 0.);
        assert_eq!(g.get(0, 2), 0.);
    }

    #[test]
    fn fill_writes_everything() {
        let mut g = Grid3D::new(2, 2, 0.0f64);
        g.fill(5.);
        assert_eq!(g.get(-1, -1), 5.);
        assert_eq!(g.get(1, 1), 5.);
        assert_eq!(g.get(2, 2), 5.);
    }
}

//! Tweezer lattice geometry and ground truth.
//!
//! Sites are enumerated `j` outer, `i` inner: flat index `j * n_i + i`.
//! Every per-site vector in the crate (positions, filling, occupancy)
//! follows that order.

use log::debug;
use shared::OccupancyMask;

use crate::error::{Result, SimulationError};

#[derive(Debug, Clone)]
pub struct Lattice {
    n_sites: (usize, usize),
    spacing_m: (f64, f64),
    angle_rad: f64,
    offset_m: (f64, f64),
    indices: Vec<(usize, usize)>,
    positions: Vec<(f64, f64)>,
    occupancy: Option<Vec<u32>>,
    ground_truth: Option<OccupancyMask>,
}

impl Lattice {
    pub fn new(
        n_sites: (usize, usize),
        spacing_m: (f64, f64),
        angle_rad: f64,
        offset_m: (f64, f64),
    ) -> Self {
        let mut lattice = Self {
            n_sites,
            spacing_m,
            angle_rad,
            offset_m,
            indices: Vec::new(),
            positions: Vec::new(),
            occupancy: None,
            ground_truth: None,
        };
        lattice.generate_sites();
        lattice
    }

    /// Physical position of site `(i, j)`.
    ///
    /// Takes floats so fractional indices (e.g. registration checks) map
    /// through the same affine transform.
    pub fn position(&self, i: f64, j: f64) -> (f64, f64) {
        let (sx, sy) = self.spacing_m;
        let x = i * sx + j * sy * self.angle_rad.sin() + self.offset_m.0;
        let y = j * sy * self.angle_rad.cos() + self.offset_m.1;
        (x, y)
    }

    /// Rebuild the index and position lists.
    pub fn generate_sites(&mut self) {
        let (ni, nj) = self.n_sites;
        self.indices = (0..nj)
            .flat_map(|j| (0..ni).map(move |i| (i, j)))
            .collect();
        self.positions = self
            .indices
            .iter()
            .map(|&(i, j)| self.position(i as f64, j as f64))
            .collect();
        debug!(
            "generated {} tweezer sites ({}x{}), spacing {:?} m, angle {} rad",
            self.positions.len(),
            ni,
            nj,
            self.spacing_m,
            self.angle_rad
        );
    }

    pub fn n_sites(&self) -> (usize, usize) {
        self.n_sites
    }

    pub fn site_count(&self) -> usize {
        self.n_sites.0 * self.n_sites.1
    }

    pub fn spacing_m(&self) -> (f64, f64) {
        self.spacing_m
    }

    pub fn indices(&self) -> &[(usize, usize)] {
        &self.indices
    }

    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    /// Flat enumeration index of `(i, j)`, if it lies on the lattice
    pub fn site_index(&self, i: usize, j: usize) -> Option<usize> {
        let (ni, nj) = self.n_sites;
        (i < ni && j < nj).then_some(j * ni + i)
    }

    /// Record the realized occupancy of one load cycle and scatter it onto
    /// the `(i, j)` grid.
    pub fn set_ground_truth_mask(&mut self, occupancy: &[u32]) -> Result<&OccupancyMask> {
        if occupancy.len() != self.site_count() {
            return Err(SimulationError::FillingLength {
                expected: self.site_count(),
                actual: occupancy.len(),
            });
        }

        let mut mask = OccupancyMask::empty(self.n_sites);
        for (&(i, j), &count) in self.indices.iter().zip(occupancy) {
            mask.set(i, j, count > 0);
        }

        self.occupancy = Some(occupancy.to_vec());
        Ok(self.ground_truth.insert(mask))
    }

    pub fn ground_truth_mask(&self) -> Result<&OccupancyMask> {
        self.ground_truth
            .as_ref()
            .ok_or(SimulationError::GroundTruthUnavailable)
    }

    pub fn occupancy(&self) -> Result<&[u32]> {
        self.occupancy
            .as_deref()
            .ok_or(SimulationError::GroundTruthUnavailable)
    }

    /// Lattice spacing expressed in pixels of a sensor with the given scale
    pub fn spacing_px(&self, scale_m_per_px: f64) -> (f64, f64) {
        (
            self.spacing_m.0 / scale_m_per_px,
            self.spacing_m.1 / scale_m_per_px,
        )
    }

    /// RMS thermal position spread of an atom in a Gaussian tweezer.
    ///
    /// `waist * sqrt(-ln(1 - T / 2U) / 2)`; fails when `T >= 2U` since the
    /// atom is then not confined.
    pub fn thermal_sigma_from_trap(
        waist_m: f64,
        temperature_k: f64,
        trap_depth_k: f64,
    ) -> Result<f64> {
        if !(trap_depth_k > 0.0) || temperature_k < 0.0 || temperature_k >= 2.0 * trap_depth_k {
            return Err(SimulationError::NotTrapped {
                temperature_k,
                trap_depth_k,
            });
        }
        let ratio = temperature_k / (2.0 * trap_depth_k);
        Ok(waist_m * (-0.5 * (1.0 - ratio).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_6;

    #[test]
    fn test_square_lattice_positions() {
        let lattice = Lattice::new((3, 2), (5e-6, 5e-6), 0.0, (1e-6, 2e-6));
        let (x, y) = lattice.position(2.0, 1.0);
        assert_relative_eq!(x, 11e-6, epsilon = 1e-15);
        assert_relative_eq!(y, 7e-6, epsilon = 1e-15);
    }

    #[test]
    fn test_sheared_lattice_positions() {
        let lattice = Lattice::new((2, 2), (4.0, 6.0), FRAC_PI_6, (0.0, 0.0));
        let (x, y) = lattice.position(1.0, 1.0);
        assert_relative_eq!(x, 4.0 + 6.0 * 0.5, epsilon = 1e-12);
        assert_relative_eq!(y, 6.0 * FRAC_PI_6.cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_enumeration_order_is_j_outer() {
        let lattice = Lattice::new((3, 2), (1.0, 1.0), 0.0, (0.0, 0.0));
        assert_eq!(
            lattice.indices(),
            &[(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]
        );
        for (k, &(i, j)) in lattice.indices().iter().enumerate() {
            assert_eq!(lattice.site_index(i, j), Some(k));
        }
        assert_eq!(lattice.site_index(3, 0), None);
        assert_eq!(lattice.positions()[4], (1.0, 1.0));
    }

    #[test]
    fn test_ground_truth_requires_occupancy() {
        let mut lattice = Lattice::new((2, 2), (1.0, 1.0), 0.0, (0.0, 0.0));
        assert!(matches!(
            lattice.ground_truth_mask(),
            Err(SimulationError::GroundTruthUnavailable)
        ));

        let mask = lattice.set_ground_truth_mask(&[0, 2, 0, 1]).unwrap();
        assert_eq!(mask.get(1, 0), Some(true));
        assert_eq!(mask.get(1, 1), Some(true));
        assert_eq!(mask.get(0, 1), Some(false));
        assert_eq!(mask.occupied_count(), 2);
        assert_eq!(lattice.occupancy().unwrap(), &[0, 2, 0, 1]);
    }

    #[test]
    fn test_ground_truth_length_mismatch() {
        let mut lattice = Lattice::new((2, 2), (1.0, 1.0), 0.0, (0.0, 0.0));
        let err = lattice.set_ground_truth_mask(&[1, 0]).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::FillingLength {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_thermal_sigma() {
        let sigma = Lattice::thermal_sigma_from_trap(1e-6, 20e-6, 1e-3).unwrap();
        let expected = 1e-6 * (-0.5 * (1.0f64 - 0.01).ln()).sqrt();
        assert_relative_eq!(sigma, expected, epsilon = 1e-18);

        assert!(Lattice::thermal_sigma_from_trap(1e-6, 2e-3, 1e-3).is_err());
        assert!(Lattice::thermal_sigma_from_trap(1e-6, 1e-6, 0.0).is_err());
    }

    #[test]
    fn test_spacing_px() {
        let lattice = Lattice::new((1, 1), (5e-6, 5e-6), 0.0, (0.0, 0.0));
        let (px, py) = lattice.spacing_px(1.08e-6);
        assert_relative_eq!(px, 4.62963, epsilon = 1e-4);
        assert_relative_eq!(py, 4.62963, epsilon = 1e-4);
    }
}

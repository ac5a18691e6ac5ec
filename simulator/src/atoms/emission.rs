//! Fluorescence photon generation.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::image_proc::noise::sample_normal;

use super::population::Atom;

/// Thermal position spread of a trapped atom, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThermalSpread {
    Isotropic(f64),
    PerAxis { x: f64, y: f64 },
}

impl ThermalSpread {
    pub fn sigmas(&self) -> (f64, f64) {
        match *self {
            Self::Isotropic(sigma) => (sigma, sigma),
            Self::PerAxis { x, y } => (x, y),
        }
    }
}

/// Photon positions in the object plane, stored as parallel coordinate vectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotonSet {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl PhotonSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }

    /// Centroid of the set, `None` when empty
    pub fn mean_position(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        Some((
            self.xs.iter().sum::<f64>() / n,
            self.ys.iter().sum::<f64>() / n,
        ))
    }
}

/// Collected photons per atom, `floor(t * rate * efficiency)`.
pub fn photons_per_atom(
    exposure_time_s: f64,
    scattering_rate_hz: f64,
    collection_efficiency: f64,
) -> u64 {
    let expected = exposure_time_s * scattering_rate_hz * collection_efficiency;
    if expected.is_finite() && expected > 0.0 {
        expected.floor() as u64
    } else {
        0
    }
}

/// Emit `photons_per_atom` photons from every atom, each displaced by an
/// independent Gaussian draw of the thermal spread.
pub fn generate_photons<R: Rng + ?Sized>(
    rng: &mut R,
    atoms: &[Atom],
    scattering_rate_hz: f64,
    thermal: ThermalSpread,
    exposure_time_s: f64,
    collection_efficiency: f64,
) -> PhotonSet {
    let per_atom = photons_per_atom(exposure_time_s, scattering_rate_hz, collection_efficiency);
    let (sigma_x, sigma_y) = thermal.sigmas();

    let mut photons = PhotonSet::with_capacity(per_atom as usize * atoms.len());
    for atom in atoms {
        for _ in 0..per_atom {
            photons.push(
                sample_normal(rng, atom.x, sigma_x),
                sample_normal(rng, atom.y, sigma_y),
            );
        }
    }

    debug!(
        "generated {} photons from {} atoms ({} each)",
        photons.len(),
        atoms.len(),
        per_atom
    );
    photons
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn atom(x: f64, y: f64, site: usize) -> Atom {
        Atom { x, y, site }
    }

    #[test]
    fn test_photon_count_scales_linearly() {
        let n1 = photons_per_atom(1e-3, 1e6, 0.1);
        let n2 = photons_per_atom(2e-3, 1e6, 0.1);
        let n3 = photons_per_atom(1e-3, 2e6, 0.1);
        assert!((99..=100).contains(&n1));
        assert!(n2.abs_diff(2 * n1) <= 1);
        assert!(n3.abs_diff(2 * n1) <= 1);
    }

    #[test]
    fn test_photons_per_atom_not_per_site() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // Two atoms stacked in one site emit twice as much as one
        let atoms = [atom(0.0, 0.0, 0), atom(0.0, 0.0, 0), atom(5.0, 0.0, 1)];
        let photons = generate_photons(
            &mut rng,
            &atoms,
            1000.0,
            ThermalSpread::Isotropic(0.0),
            0.01,
            1.0,
        );
        assert_eq!(photons.len(), 30);
        assert_eq!(photons.iter().filter(|(x, _)| *x == 0.0).count(), 20);
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let none = generate_photons(&mut rng, &[], 1e6, ThermalSpread::Isotropic(1.0), 1.0, 1.0);
        assert!(none.is_empty());
        assert_eq!(none.mean_position(), None);

        let dark = generate_photons(
            &mut rng,
            &[atom(1.0, 1.0, 0)],
            1e6,
            ThermalSpread::Isotropic(1.0),
            0.0,
            1.0,
        );
        assert!(dark.is_empty());
    }

    #[test]
    fn test_thermal_blur_preserves_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let photons = generate_photons(
            &mut rng,
            &[atom(3.0, -2.0, 0)],
            1.0,
            ThermalSpread::PerAxis { x: 0.5, y: 0.1 },
            200_000.0,
            1.0,
        );
        let (mx, my) = photons.mean_position().unwrap();
        assert_relative_eq!(mx, 3.0, epsilon = 0.01);
        assert_relative_eq!(my, -2.0, epsilon = 0.005);

        let n = photons.len() as f64;
        let var_x = photons.xs.iter().map(|x| (x - mx).powi(2)).sum::<f64>() / n;
        assert_relative_eq!(var_x.sqrt(), 0.5, epsilon = 0.01);
    }

    #[test]
    fn test_thermal_spread_serde() {
        let iso: ThermalSpread = serde_json::from_str("7e-8").unwrap();
        assert_eq!(iso, ThermalSpread::Isotropic(7e-8));
        let axes: ThermalSpread = serde_json::from_str(r#"{"x": 1e-7, "y": 2e-7}"#).unwrap();
        assert_eq!(axes.sigmas(), (1e-7, 2e-7));
    }
}

//! Imaging objective: light collection and diffraction blur.

use log::debug;
use rand::Rng;
use shared::image_proc::noise::sample_normal;

use crate::atoms::PhotonSet;
use crate::error::{Result, SimulationError};

/// Width of the Gaussian that best fits the Airy core, in units of
/// `wavelength / (2 NA)`.
pub const GAUSSIAN_AIRY_PREFACTOR: f64 = 0.42;

#[derive(Debug, Clone, PartialEq)]
pub struct Optics {
    magnification: f64,
    numerical_aperture: f64,
    wavelength_m: f64,
    psf_prefactor: f64,
    axis_scale: (f64, f64),
    collection_efficiency: f64,
    sigma_diffraction_m: f64,
}

impl Optics {
    pub fn new(
        magnification: f64,
        numerical_aperture: f64,
        wavelength_m: f64,
        psf_prefactor: f64,
    ) -> Result<Self> {
        if !(magnification > 0.0) {
            return Err(SimulationError::invalid(
                "optics.magnification",
                format!("must be positive, got {magnification}"),
            ));
        }
        if !(numerical_aperture > 0.0 && numerical_aperture < 1.0) {
            return Err(SimulationError::invalid(
                "optics.numerical_aperture",
                format!("must lie in (0, 1), got {numerical_aperture}"),
            ));
        }
        if !(wavelength_m > 0.0) {
            return Err(SimulationError::invalid(
                "atoms.species.imaging_wavelength_m",
                format!("must be positive, got {wavelength_m}"),
            ));
        }
        if !(psf_prefactor > 0.0) {
            return Err(SimulationError::invalid(
                "optics.psf_prefactor",
                format!("must be positive, got {psf_prefactor}"),
            ));
        }

        let collection_efficiency = 0.5 * (1.0 - (1.0 - numerical_aperture.powi(2)).sqrt());
        let sigma_diffraction_m = psf_prefactor * wavelength_m / (2.0 * numerical_aperture);
        debug!(
            "optics: NA {numerical_aperture}, collection efficiency {collection_efficiency:.4}, \
             PSF sigma {:.3} um",
            sigma_diffraction_m * 1e6
        );

        Ok(Self {
            magnification,
            numerical_aperture,
            wavelength_m,
            psf_prefactor,
            axis_scale: (1.0, 1.0),
            collection_efficiency,
            sigma_diffraction_m,
        })
    }

    /// Stretch the PSF independently along x and y.
    pub fn with_axis_scale(mut self, scale_x: f64, scale_y: f64) -> Result<Self> {
        if !(scale_x >= 0.0 && scale_y >= 0.0) {
            return Err(SimulationError::invalid(
                "optics.psf_axis_scale",
                format!("must be non-negative, got ({scale_x}, {scale_y})"),
            ));
        }
        self.axis_scale = (scale_x, scale_y);
        Ok(self)
    }

    pub fn magnification(&self) -> f64 {
        self.magnification
    }

    pub fn numerical_aperture(&self) -> f64 {
        self.numerical_aperture
    }

    pub fn wavelength_m(&self) -> f64 {
        self.wavelength_m
    }

    pub fn psf_prefactor(&self) -> f64 {
        self.psf_prefactor
    }

    /// Fraction of isotropically emitted photons entering the objective
    pub fn collection_efficiency(&self) -> f64 {
        self.collection_efficiency
    }

    /// PSF standard deviation along x and y in the object plane
    pub fn sigma_diffraction_m(&self) -> (f64, f64) {
        (
            self.sigma_diffraction_m * self.axis_scale.0,
            self.sigma_diffraction_m * self.axis_scale.1,
        )
    }

    /// Object-plane size of one sensor pixel
    pub fn image_scale(&self, pixel_size_m: f64) -> f64 {
        pixel_size_m / self.magnification
    }

    /// Displace every photon by an independent draw from the PSF.
    pub fn apply_diffraction<R: Rng + ?Sized>(&self, rng: &mut R, photons: PhotonSet) -> PhotonSet {
        let (sigma_x, sigma_y) = self.sigma_diffraction_m();
        let PhotonSet { mut xs, mut ys } = photons;
        xs.iter_mut().for_each(|x| *x = sample_normal(rng, *x, sigma_x));
        ys.iter_mut().for_each(|y| *y = sample_normal(rng, *y, sigma_y));
        PhotonSet { xs, ys }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const CS_D2: f64 = 852.347e-9;

    #[test]
    fn test_collection_efficiency() {
        let optics = Optics::new(12.5, 0.6, CS_D2, GAUSSIAN_AIRY_PREFACTOR).unwrap();
        assert_relative_eq!(optics.collection_efficiency(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_diffraction_sigma_uses_prefactor() {
        let unit = Optics::new(12.5, 0.6, CS_D2, 1.0).unwrap();
        let airy = Optics::new(12.5, 0.6, CS_D2, GAUSSIAN_AIRY_PREFACTOR).unwrap();
        assert_relative_eq!(unit.sigma_diffraction_m().0, CS_D2 / 1.2, epsilon = 1e-18);
        assert_relative_eq!(
            airy.sigma_diffraction_m().0,
            0.42 * CS_D2 / 1.2,
            epsilon = 1e-18
        );
    }

    #[test]
    fn test_image_scale() {
        let optics = Optics::new(12.5, 0.6, CS_D2, 1.0).unwrap();
        assert_relative_eq!(optics.image_scale(13.5e-6), 1.08e-6, epsilon = 1e-18);
    }

    #[test]
    fn test_rejects_bad_aperture() {
        assert!(Optics::new(12.5, 1.0, CS_D2, 1.0).is_err());
        assert!(Optics::new(12.5, 0.0, CS_D2, 1.0).is_err());
        assert!(Optics::new(0.0, 0.5, CS_D2, 1.0).is_err());
        assert!(Optics::new(10.0, 0.5, CS_D2, 0.0).is_err());
    }

    #[test]
    fn test_diffraction_preserves_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let optics = Optics::new(10.0, 0.5, 1e-6, 1.0)
            .unwrap()
            .with_axis_scale(1.0, 2.0)
            .unwrap();
        let mut photons = PhotonSet::with_capacity(100_000);
        for _ in 0..100_000 {
            photons.push(5e-6, -1e-6);
        }

        let blurred = optics.apply_diffraction(&mut rng, photons);
        let (mx, my) = blurred.mean_position().unwrap();
        assert_relative_eq!(mx, 5e-6, epsilon = 1.5e-8);
        assert_relative_eq!(my, -1e-6, epsilon = 3e-8);

        let n = blurred.len() as f64;
        let sy = (blurred.ys.iter().map(|y| (y - my).powi(2)).sum::<f64>() / n).sqrt();
        assert_relative_eq!(sy, 2e-6, epsilon = 3e-8);
    }

    #[test]
    fn test_empty_photons_pass_through() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let optics = Optics::new(10.0, 0.5, 1e-6, 1.0).unwrap();
        assert!(optics.apply_diffraction(&mut rng, PhotonSet::default()).is_empty());
    }
}

//! Spatial binning of photon positions onto the pixel grid.

use log::warn;
use ndarray::Array2;
use shared::ImageSize;

use crate::atoms::PhotonSet;

/// Mapping from object-plane metres to sensor pixels.
///
/// Pixel edges sit at `(k - position_px) * scale_m_per_px`, so a photon at
/// `x` lands in pixel `floor(x / scale + position_px)`. Bins are half-open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    pub size: ImageSize,
    pub scale_m_per_px: f64,
    pub position_px: (f64, f64),
}

impl PixelGrid {
    pub fn pixel_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let px = (x / self.scale_m_per_px + self.position_px.0).floor();
        let py = (y / self.scale_m_per_px + self.position_px.1).floor();
        if !px.is_finite() || !py.is_finite() {
            return None;
        }
        let (px, py) = (px as i64, py as i64);
        self.size
            .contains(px, py)
            .then_some((px as usize, py as usize))
    }
}

/// Histogram photons into an `[x, y]` count grid.
///
/// Photons landing off the sensor are dropped and reported.
pub fn bin_photons(photons: &PhotonSet, grid: &PixelGrid) -> Array2<f64> {
    let mut counts = Array2::<f64>::zeros(grid.size.to_tuple());
    let mut outside = 0usize;

    for (x, y) in photons.iter() {
        match grid.pixel_of(x, y) {
            Some(idx) => counts[idx] += 1.0,
            None => outside += 1,
        }
    }

    if outside > 0 {
        warn!(
            "{} of {} photons fell outside the {} sensor",
            outside,
            photons.len(),
            grid.size
        );
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PixelGrid {
        PixelGrid {
            size: ImageSize::from_width_height(8, 6),
            scale_m_per_px: 1e-6,
            position_px: (4.0, 4.0),
        }
    }

    #[test]
    fn test_pixel_offset() {
        let g = grid();
        assert_eq!(g.pixel_of(0.0, 0.0), Some((4, 4)));
        assert_eq!(g.pixel_of(0.99e-6, -0.5e-6), Some((4, 3)));
        assert_eq!(g.pixel_of(-3.99e-6, -3.99e-6), Some((0, 0)));
        assert_eq!(g.pixel_of(-4.01e-6, 0.0), None);
        assert_eq!(g.pixel_of(4.01e-6, 0.0), None);
        assert_eq!(g.pixel_of(f64::NAN, 0.0), None);
    }

    #[test]
    fn test_bin_counts() {
        let mut photons = PhotonSet::default();
        photons.push(0.1e-6, 0.1e-6);
        photons.push(0.2e-6, 0.3e-6);
        photons.push(1.5e-6, 0.0);
        photons.push(100e-6, 0.0);

        let counts = bin_photons(&photons, &grid());
        assert_eq!(counts.dim(), (8, 6));
        assert_eq!(counts[[4, 4]], 2.0);
        assert_eq!(counts[[5, 4]], 1.0);
        assert_eq!(counts.sum(), 3.0);
    }

    #[test]
    fn test_empty_photon_set() {
        let counts = bin_photons(&PhotonSet::default(), &grid());
        assert_eq!(counts.sum(), 0.0);
    }
}

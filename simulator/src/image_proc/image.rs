//! Digitized frames and regions of interest.

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use shared::ImageSize;
use std::fmt;

use crate::error::{Result, SimulationError};

/// Rectangular pixel region `[xmin, xmax) x [ymin, ymax)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub xmin: usize,
    pub xmax: usize,
    pub ymin: usize,
    pub ymax: usize,
}

impl Roi {
    pub fn new(xmin: usize, xmax: usize, ymin: usize, ymax: usize) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Region covering a whole frame
    pub fn full(size: ImageSize) -> Self {
        Self::new(0, size.width, 0, size.height)
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::from_width_height(
            self.xmax.saturating_sub(self.xmin),
            self.ymax.saturating_sub(self.ymin),
        )
    }

    pub fn fits_within(&self, size: ImageSize) -> bool {
        self.xmin <= self.xmax
            && self.ymin <= self.ymax
            && self.xmax <= size.width
            && self.ymax <= size.height
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.xmin, self.xmax, self.ymin, self.ymax
        )
    }
}

/// One exposure: the noisy frame and its noise-free counterpart.
///
/// Both arrays are indexed `[x, y]`. `origin_px` tracks where the frame
/// sits on the full sensor so crops of crops stay registered.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorImage {
    pub image: Array2<u16>,
    pub signal: Array2<u16>,
    pub scale_m_per_px: f64,
    pub offset_px: (f64, f64),
    pub origin_px: (usize, usize),
}

impl SensorImage {
    pub fn size(&self) -> ImageSize {
        ImageSize::of_array(&self.image)
    }

    /// Cut both frames to `roi`. The source is left untouched.
    pub fn crop(&self, roi: &Roi) -> Result<SensorImage> {
        let size = self.size();
        if !roi.fits_within(size) {
            return Err(SimulationError::RoiOutOfBounds { roi: *roi, size });
        }
        let window = s![roi.xmin..roi.xmax, roi.ymin..roi.ymax];
        Ok(SensorImage {
            image: self.image.slice(window).to_owned(),
            signal: self.signal.slice(window).to_owned(),
            scale_m_per_px: self.scale_m_per_px,
            offset_px: (
                self.offset_px.0 - roi.xmin as f64,
                self.offset_px.1 - roi.ymin as f64,
            ),
            origin_px: (self.origin_px.0 + roi.xmin, self.origin_px.1 + roi.ymin),
        })
    }

    pub fn max_value(&self) -> u16 {
        self.image.iter().copied().max().unwrap_or(0)
    }

    /// Mean of the noisy frame in counts
    pub fn mean(&self) -> f64 {
        if self.image.is_empty() {
            return 0.0;
        }
        self.image.iter().map(|&v| f64::from(v)).sum::<f64>() / self.image.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_image() -> SensorImage {
        let image = Array2::from_shape_fn((10, 8), |(x, y)| (x * 10 + y) as u16);
        let signal = image.mapv(|v| v + 1);
        SensorImage {
            image,
            signal,
            scale_m_per_px: 1e-6,
            offset_px: (4.0, 4.0),
            origin_px: (0, 0),
        }
    }

    #[test]
    fn test_crop_shape_and_pixels() {
        let full = ramp_image();
        let roi = Roi::new(2, 7, 1, 4);
        let cropped = full.crop(&roi).unwrap();

        assert_eq!(cropped.image.dim(), (5, 3));
        assert_eq!(cropped.size(), roi.size());
        assert_eq!(
            cropped.image,
            full.image.slice(s![2..7, 1..4]).to_owned()
        );
        assert_eq!(cropped.signal, full.signal.slice(s![2..7, 1..4]).to_owned());
        assert_eq!(cropped.image[[0, 0]], 21);
        assert_eq!(cropped.origin_px, (2, 1));
        assert_eq!(cropped.offset_px, (2.0, 3.0));
    }

    #[test]
    fn test_crop_does_not_mutate_source() {
        let full = ramp_image();
        let before = full.clone();
        let _ = full.crop(&Roi::new(0, 3, 0, 3)).unwrap();
        assert_eq!(full, before);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let full = ramp_image();
        assert!(matches!(
            full.crop(&Roi::new(0, 11, 0, 3)),
            Err(SimulationError::RoiOutOfBounds { .. })
        ));
        assert!(full.crop(&Roi::new(5, 4, 0, 3)).is_err());
        // Empty regions are valid
        assert_eq!(full.crop(&Roi::new(3, 3, 0, 8)).unwrap().image.len(), 0);
    }

    #[test]
    fn test_full_roi() {
        let full = ramp_image();
        let same = full.crop(&Roi::full(full.size())).unwrap();
        assert_eq!(same.image, full.image);
        assert_eq!(Roi::full(full.size()).to_string(), "[0, 10) x [0, 8)");
    }
}

//! Detector calibration and pixel-to-lattice mapping.
//!
//! A [`Detector`] needs the lattice spacing in pixels and the pixel
//! position of one known site (found from a reference image holding a
//! single atom) before it can assign blobs to lattice indices. The spacing
//! comes first; setting the reference completes calibration.
//!
//! Frames are scaled to a unit maximum before detection. On a frame with
//! no atoms that maximum is itself a noise peak, so a dark frame can fix
//! a normalization floor (see [`Detector::calibrate_dark`]) below which
//! the frame is not stretched.

use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use crate::blob::{detect_blobs, Blob};
use crate::config::DetectorOptions;
use crate::error::{DetectionError, Result};
use crate::mask::mask_from_indices;
use shared::OccupancyMask;

/// How far calibration has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStage {
    Uninitialized,
    SpacingSet,
    /// Spacing and reference both known
    Ready,
}

/// Everything one call to [`Detector::locate`] learned about an image
#[derive(Debug, Clone)]
pub struct Detection {
    pub blobs: Vec<Blob>,
    /// Lattice index of each blob, in the same order
    pub indices: Vec<(i64, i64)>,
    pub mask: OccupancyMask,
    /// Blobs whose index fell outside the lattice
    pub dropped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Detector {
    spacing_px: Option<(f64, f64)>,
    reference_px: Option<(f64, f64)>,
    reference_index: (i64, i64),
    background: Option<Array2<f64>>,
    noise_floor: Option<f64>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lattice index assigned to the reference site, `(0, 0)` by default
    pub fn with_reference_index(mut self, index: (i64, i64)) -> Self {
        self.reference_index = index;
        self
    }

    pub fn stage(&self) -> CalibrationStage {
        match (self.spacing_px, self.reference_px) {
            (None, _) => CalibrationStage::Uninitialized,
            (Some(_), None) => CalibrationStage::SpacingSet,
            (Some(_), Some(_)) => CalibrationStage::Ready,
        }
    }

    pub fn spacing_px(&self) -> Option<(f64, f64)> {
        self.spacing_px
    }

    pub fn reference_px(&self) -> Option<(f64, f64)> {
        self.reference_px
    }

    pub fn reference_index(&self) -> (i64, i64) {
        self.reference_index
    }

    pub fn noise_floor(&self) -> Option<f64> {
        self.noise_floor
    }

    /// Set the lattice step along each image axis, in pixels.
    pub fn set_spacing(&mut self, x: f64, y: f64) -> Result<()> {
        if !(x > 0.0 && y > 0.0 && x.is_finite() && y.is_finite()) {
            return Err(DetectionError::InvalidSpacing { x, y });
        }
        self.spacing_px = Some((x, y));
        Ok(())
    }

    /// Image subtracted from every frame before normalization.
    pub fn set_background<T: Copy + Into<f64>>(&mut self, background: &ArrayView2<T>) {
        self.background = Some(background.mapv(Into::into));
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    /// Smallest value a frame maximum is allowed to take when normalizing.
    pub fn set_noise_floor(&mut self, floor: f64) -> Result<()> {
        if !(floor >= 0.0 && floor.is_finite()) {
            return Err(DetectionError::InvalidOptions {
                field: "noise_floor",
                reason: format!("must be non-negative and finite, got {floor}"),
            });
        }
        self.noise_floor = Some(floor);
        Ok(())
    }

    /// Set `expected` as background and a noise floor from a dark frame.
    ///
    /// `dark` is a frame taken with nothing to image and `expected` its
    /// noise-free level. The floor is `floor_sigmas` times the standard
    /// deviation of their difference. Returns the floor.
    pub fn calibrate_dark<T: Copy + Into<f64>>(
        &mut self,
        dark: &ArrayView2<T>,
        expected: &ArrayView2<T>,
        floor_sigmas: f64,
    ) -> Result<f64> {
        if dark.dim() != expected.dim() {
            return Err(DetectionError::ShapeMismatch {
                expected: expected.dim(),
                actual: dark.dim(),
            });
        }
        let background: Array2<f64> = expected.mapv(Into::into);
        let dark: Array2<f64> = dark.mapv(Into::into);
        let residual = dark - &background;
        let noise_std = if residual.is_empty() {
            0.0
        } else {
            residual.std(0.0)
        };
        self.set_noise_floor(floor_sigmas * noise_std)?;
        self.background = Some(background);
        info!(
            "dark frame noise {noise_std:.3} counts, normalization floor {:.1}",
            floor_sigmas * noise_std
        );
        Ok(floor_sigmas * noise_std)
    }

    /// Background-subtracted image scaled to a maximum of one.
    ///
    /// With a noise floor set the image is divided by the larger of its
    /// maximum and the floor. An image with no positive pixel normalizes to
    /// all zeros.
    pub fn normalize<T: Copy + Into<f64>>(&self, image: &ArrayView2<T>) -> Result<Array2<f64>> {
        let mut normalized = image.mapv(Into::into);
        if let Some(background) = &self.background {
            if background.dim() != normalized.dim() {
                return Err(DetectionError::ShapeMismatch {
                    expected: background.dim(),
                    actual: normalized.dim(),
                });
            }
            normalized -= background;
        }

        let max = normalized.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let scale = max.max(self.noise_floor.unwrap_or(0.0));
        if max > 0.0 {
            normalized.mapv_inplace(|v| v / scale);
        } else {
            normalized.fill(0.0);
        }
        Ok(normalized)
    }

    /// Locate the reference site from an image with exactly one atom.
    ///
    /// The spacing must already be set.
    pub fn set_reference<T: Copy + Into<f64>>(&mut self, image: &ArrayView2<T>) -> Result<()> {
        if self.spacing_px.is_none() {
            return Err(DetectionError::NotCalibrated { missing: "spacing" });
        }
        let normalized = self.normalize(image)?;
        let blobs = detect_blobs(&normalized.view(), &DetectorOptions::reference())?;
        match blobs.as_slice() {
            [blob] => {
                info!("reference site at pixel ({}, {})", blob.x, blob.y);
                self.reference_px = Some(blob.position());
                Ok(())
            }
            _ => Err(DetectionError::ReferenceBlobCount {
                count: blobs.len(),
                positions: blobs.iter().map(Blob::position).collect(),
            }),
        }
    }

    fn calibration(&self) -> Result<((f64, f64), (f64, f64))> {
        match (self.spacing_px, self.reference_px) {
            (Some(spacing), Some(reference)) => Ok((spacing, reference)),
            (None, _) => Err(DetectionError::NotCalibrated {
                missing: "spacing and reference",
            }),
            (Some(_), None) => Err(DetectionError::NotCalibrated {
                missing: "reference",
            }),
        }
    }

    /// Normalize `image` and find its blobs.
    pub fn detect<T: Copy + Into<f64>>(
        &self,
        image: &ArrayView2<T>,
        options: &DetectorOptions,
    ) -> Result<Vec<Blob>> {
        self.calibration()?;
        let normalized = self.normalize(image)?;
        detect_blobs(&normalized.view(), options)
    }

    /// Round each pixel position to the nearest lattice index, axis by axis.
    pub fn indices_from_pixels(&self, positions: &[(f64, f64)]) -> Result<Vec<(i64, i64)>> {
        let ((sx, sy), (rx, ry)) = self.calibration()?;
        let (i0, j0) = self.reference_index;
        Ok(positions
            .iter()
            .map(|&(x, y)| {
                (
                    ((x - rx) / sx).round() as i64 + i0,
                    ((y - ry) / sy).round() as i64 + j0,
                )
            })
            .collect())
    }

    /// Detect blobs, map them to indices and build the occupancy mask.
    pub fn locate<T: Copy + Into<f64>>(
        &self,
        image: &ArrayView2<T>,
        options: &DetectorOptions,
        lattice_shape: (usize, usize),
    ) -> Result<Detection> {
        let blobs = self.detect(image, options)?;
        let positions: Vec<(f64, f64)> = blobs.iter().map(Blob::position).collect();
        let indices = self.indices_from_pixels(&positions)?;
        let (mask, dropped) = mask_from_indices(&indices, lattice_shape);
        debug!(
            "located {} blobs, {} sites occupied",
            blobs.len(),
            mask.occupied_count()
        );
        Ok(Detection {
            blobs,
            indices,
            mask,
            dropped,
        })
    }
}

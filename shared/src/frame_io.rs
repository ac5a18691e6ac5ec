//! On-disk artifacts: 16-bit frames and batches of shots.
//!
//! Frames are `[x, y]` indexed `u16` arrays. Single frames go to 16-bit
//! grayscale PNG, batches of shots (with the ground-truth masks that
//! produced them) go to pretty-printed JSON.

use crate::occupancy_mask::MaskRecord;
use image::{ImageBuffer, Luma};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame {index} has {actual} pixels, batch expects {expected}")]
    FrameSize {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("batch is empty")]
    EmptyBatch,
}

/// Write an `[x, y]` indexed frame as a 16-bit grayscale PNG
pub fn save_png_u16(path: &Path, frame: &Array2<u16>) -> Result<(), FrameIoError> {
    let (width, height) = frame.dim();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            Luma([frame[[x as usize, y as usize]]])
        });
    buffer.save(path)?;
    Ok(())
}

/// Read any grayscale image back into an `[x, y]` indexed `u16` frame
pub fn load_png_u16(path: &Path) -> Result<Array2<u16>, FrameIoError> {
    let img = image::open(path)?.into_luma16();
    let (width, height) = img.dimensions();
    Ok(Array2::from_shape_fn(
        (width as usize, height as usize),
        |(x, y)| img.get_pixel(x as u32, y as u32)[0],
    ))
}

/// A batch of equally sized shots stored flat, x-major per frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotBatch {
    pub width: usize,
    pub height: usize,
    /// Sensor scale in metres per pixel
    pub scale_m_per_px: f64,
    pub frames: Vec<Vec<u16>>,
    /// Ground truth per frame, when known
    #[serde(default)]
    pub truth: Vec<MaskRecord>,
}

impl ShotBatch {
    pub fn new(width: usize, height: usize, scale_m_per_px: f64) -> Self {
        Self {
            width,
            height,
            scale_m_per_px,
            frames: Vec::new(),
            truth: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: &Array2<u16>) -> Result<(), FrameIoError> {
        let expected = self.width * self.height;
        if frame.dim() != (self.width, self.height) {
            return Err(FrameIoError::FrameSize {
                index: self.frames.len(),
                expected,
                actual: frame.len(),
            });
        }
        self.frames.push(frame.iter().copied().collect());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<Result<Array2<u16>, FrameIoError>> {
        let data = self.frames.get(index)?;
        Some(
            Array2::from_shape_vec((self.width, self.height), data.clone()).map_err(|_| {
                FrameIoError::FrameSize {
                    index,
                    expected: self.width * self.height,
                    actual: data.len(),
                }
            }),
        )
    }

    /// Pixel-wise mean over all frames
    pub fn mean_frame(&self) -> Result<Array2<f64>, FrameIoError> {
        if self.frames.is_empty() {
            return Err(FrameIoError::EmptyBatch);
        }
        let mut acc = Array2::<f64>::zeros((self.width, self.height));
        for index in 0..self.frames.len() {
            if let Some(frame) = self.frame(index) {
                acc += &frame?.mapv(f64::from);
            }
        }
        Ok(acc / self.frames.len() as f64)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), FrameIoError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, FrameIoError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn ramp(width: usize, height: usize) -> Array2<u16> {
        Array2::from_shape_fn((width, height), |(x, y)| (x * 1000 + y) as u16)
    }

    #[test]
    fn test_png_preserves_orientation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let frame = ramp(5, 3);

        save_png_u16(&path, &frame).unwrap();
        let loaded = load_png_u16(&path).unwrap();

        assert_eq!(loaded.dim(), (5, 3));
        assert_eq!(loaded, frame);
        assert_eq!(loaded[[4, 2]], 4002);
    }

    #[test]
    fn test_batch_file_and_mean() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.json");

        let mut batch = ShotBatch::new(4, 2, 1.08e-6);
        batch.push(&Array2::from_elem((4, 2), 10)).unwrap();
        batch.push(&Array2::from_elem((4, 2), 20)).unwrap();
        batch.save_to_file(&path).unwrap();

        let loaded = ShotBatch::load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_relative_eq!(loaded.scale_m_per_px, 1.08e-6);
        let mean = loaded.mean_frame().unwrap();
        assert!(mean.iter().all(|v| (*v - 15.0).abs() < 1e-12));
    }

    #[test]
    fn test_batch_rejects_wrong_shape() {
        let mut batch = ShotBatch::new(4, 2, 1.0);
        let err = batch.push(&Array2::zeros((2, 4))).unwrap_err();
        assert!(matches!(err, FrameIoError::FrameSize { index: 0, .. }));
        assert!(matches!(
            ShotBatch::new(1, 1, 1.0).mean_frame(),
            Err(FrameIoError::EmptyBatch)
        ));
    }
}

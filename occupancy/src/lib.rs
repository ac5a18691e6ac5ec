//! Recovering lattice occupancy from fluorescence images.
//!
//! A [`Detector`] is calibrated with the lattice spacing and a single-atom
//! reference image, then maps the blobs found in each frame to lattice
//! indices and an [`shared::OccupancyMask`]. [`evaluation`] scores the
//! result against ground truth and [`sorting`] plans the moves that
//! compact each row.

pub mod blob;
pub mod calibration;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod filter;
pub mod mask;
pub mod sorting;

pub use blob::{detect_blobs, Blob};
pub use calibration::{CalibrationStage, Detection, Detector};
pub use config::{BlobMethod, DetectorOptions};
pub use error::DetectionError;
pub use mask::mask_from_indices;

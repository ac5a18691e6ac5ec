//! Frame types and photon binning for the sensor models.

pub mod histogram;
pub mod image;

pub use histogram::{bin_photons, PixelGrid};
pub use image::{Roi, SensorImage};

//! Shared components and utilities for the tweezer imaging workspace.
//!
//! Holds the pieces every other crate touches: image dimensions, the
//! lattice occupancy mask, seeded parallel array processing, sensor noise
//! primitives, typed physical units and on-disk artifacts.

pub mod algo;
pub mod frame_io;
pub mod image_proc;
pub mod image_size;
pub mod occupancy_mask;
pub mod units;

pub use image_size::ImageSize;
pub use occupancy_mask::OccupancyMask;

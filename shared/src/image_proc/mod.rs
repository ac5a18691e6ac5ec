//! Pixel-level image processing primitives.

pub mod noise;

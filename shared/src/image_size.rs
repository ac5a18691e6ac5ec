//! Image dimensions and size utilities

use ndarray::Array2;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image dimensions structure
///
/// Represents the width and height of a sensor or frame. Frames in this
/// workspace are indexed `[x, y]`, so arrays built from an `ImageSize`
/// have shape `(width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels (first array axis)
    pub width: usize,
    /// Image height in pixels (second array axis)
    pub height: usize,
}

impl ImageSize {
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size of an `[x, y]` indexed array
    pub fn of_array<T>(array: &Array2<T>) -> Self {
        let (width, height) = array.dim();
        Self { width, height }
    }

    /// Zeroed array of shape `(width, height)`
    pub fn empty_array<T>(&self) -> Array2<T>
    where
        T: Clone + Zero,
    {
        Array2::from_elem((self.width, self.height), T::zero())
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether the signed pixel coordinate lies on the grid
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn to_tuple(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::from_width_height(dimensions.0, dimensions.1)
    }
}

impl From<ImageSize> for (usize, usize) {
    fn from(size: ImageSize) -> Self {
        size.to_tuple()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_shape_is_width_major() {
        let size = ImageSize::from_width_height(7, 3);
        let arr: Array2<u16> = size.empty_array();
        assert_eq!(arr.dim(), (7, 3));
        assert_eq!(ImageSize::of_array(&arr), size);
    }

    #[test]
    fn test_contains() {
        let size = ImageSize::from_width_height(4, 2);
        assert!(size.contains(0, 0));
        assert!(size.contains(3, 1));
        assert!(!size.contains(4, 1));
        assert!(!size.contains(-1, 0));
        assert!(!size.contains(0, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(ImageSize::from((1024, 512)).to_string(), "1024x512");
    }
}

//! Lattice indices to occupancy masks.

use log::warn;
use shared::OccupancyMask;

/// Mark every in-bounds index of a lattice of `shape` sites.
///
/// Indices outside `[0, n_i) x [0, n_j)` are skipped; their number is
/// returned alongside the mask.
pub fn mask_from_indices(indices: &[(i64, i64)], shape: (usize, usize)) -> (OccupancyMask, usize) {
    let mut mask = OccupancyMask::empty(shape);
    let dropped = indices
        .iter()
        .filter(|&&(i, j)| !mask.mark(i, j))
        .count();
    if dropped > 0 {
        warn!(
            "dropped {dropped} of {} detections outside the {}x{} lattice",
            indices.len(),
            shape.0,
            shape.1
        );
    }
    (mask, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_in_bounds() {
        let (mask, dropped) = mask_from_indices(&[(0, 0), (2, 1), (2, 1)], (3, 2));
        assert_eq!(dropped, 0);
        assert_eq!(mask.occupied_sites(), vec![(0, 0), (2, 1)]);
    }

    #[test]
    fn test_drops_out_of_bounds() {
        let (mask, dropped) = mask_from_indices(&[(-1, 0), (0, 5), (3, 0), (1, 1)], (3, 3));
        assert_eq!(dropped, 3);
        assert_eq!(mask.occupied_count(), 1);
        assert_eq!(mask.get(1, 1), Some(true));
    }

    #[test]
    fn test_no_indices() {
        let (mask, dropped) = mask_from_indices(&[], (4, 4));
        assert_eq!(dropped, 0);
        assert_eq!(mask.occupied_count(), 0);
        assert_eq!(mask.shape(), (4, 4));
    }
}

//! Rearrangement planning for one-dimensional tweezer rows.
//!
//! Each occupied site is moved toward a reference site by the number of
//! empty sites between them, compacting the row without collisions.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Where a row is compacted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
    /// An explicit reference site
    Index(usize),
}

impl Alignment {
    fn reference(self, len: usize) -> usize {
        match self {
            Alignment::Left => 0,
            Alignment::Right => len.saturating_sub(1),
            Alignment::Center => len / 2,
            Alignment::Index(k) => k,
        }
    }
}

/// Signed move for every site; `None` for empty sites.
///
/// Sites before the reference count the empty sites from themselves up to
/// (not including) the reference and move forward; sites after it count
/// from the reference up to themselves and move backward.
pub fn rearrangement_shifts(occupancies: &[bool], alignment: Alignment) -> Vec<Option<i64>> {
    let reference = alignment.reference(occupancies.len()).min(occupancies.len());
    occupancies
        .iter()
        .enumerate()
        .map(|(idx, &occupied)| {
            if !occupied {
                return None;
            }
            let (start, stop) = (idx.min(reference), idx.max(reference));
            let empty = occupancies[start..stop].iter().filter(|o| !**o).count() as i64;
            Some(if idx > reference { -empty } else { empty })
        })
        .collect()
}

/// Shifts along the second axis for every row of a mask-shaped grid
pub fn row_shifts(occupancy: &ArrayView2<bool>, alignment: Alignment) -> Vec<Vec<Option<i64>>> {
    occupancy
        .outer_iter()
        .map(|row| {
            let row: Vec<bool> = row.iter().copied().collect();
            rearrangement_shifts(&row, alignment)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: [bool; 6] = [false, true, false, false, true, true];

    fn apply(occupancies: &[bool], shifts: &[Option<i64>]) -> Vec<bool> {
        let mut out = vec![false; occupancies.len()];
        for (idx, shift) in shifts.iter().enumerate() {
            if let Some(s) = shift {
                let target = (idx as i64 + s) as usize;
                assert!(!out[target], "collision at {target}");
                out[target] = true;
            }
        }
        out
    }

    #[test]
    fn test_left_alignment() {
        let shifts = rearrangement_shifts(&ROW, Alignment::Left);
        assert_eq!(shifts, vec![None, Some(-1), None, None, Some(-3), Some(-3)]);
        assert_eq!(
            apply(&ROW, &shifts),
            vec![true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_right_alignment() {
        let row = [true, false, true, false, false, false];
        let shifts = rearrangement_shifts(&row, Alignment::Right);
        assert_eq!(shifts, vec![Some(3), None, Some(2), None, None, None]);
        assert_eq!(
            apply(&row, &shifts),
            vec![false, false, false, true, true, false]
        );
    }

    #[test]
    fn test_center_alignment() {
        let row = [true, false, false, false, false, true];
        let shifts = rearrangement_shifts(&row, Alignment::Center);
        assert_eq!(shifts, vec![Some(2), None, None, None, None, Some(-2)]);
        assert_eq!(
            apply(&row, &shifts),
            vec![false, false, true, true, false, false]
        );
    }

    #[test]
    fn test_index_alignment_and_edges() {
        let shifts = rearrangement_shifts(&ROW, Alignment::Index(4));
        assert_eq!(shifts, vec![None, Some(2), None, None, Some(0), Some(0)]);
        assert!(rearrangement_shifts(&[], Alignment::Right).is_empty());
        let beyond = rearrangement_shifts(&[true, false], Alignment::Index(9));
        assert_eq!(beyond, vec![Some(1), None]);
    }

    #[test]
    fn test_row_shifts() {
        let grid = ndarray::array![[true, false, true], [false, false, true]];
        let shifts = row_shifts(&grid.view(), Alignment::Left);
        assert_eq!(shifts[0], vec![Some(0), None, Some(-1)]);
        assert_eq!(shifts[1], vec![None, None, Some(-2)]);
    }
}

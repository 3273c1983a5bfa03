//! Neighbourhood window extraction.

use crate::types::{DatasetResult, PatchDatasetError};
use ndarray::{s, ArrayView3};

/// Window of `(2P+1, 2P+1, bands)` centred on padded-space `(center_row, center_col)`.
///
/// Fails with `WindowOutOfRange` if the window would leave `padded`, which
/// happens when the caller passes an unpadded coordinate.
pub fn extract_patch(
    padded: ArrayView3<'_, f32>,
    center_row: usize,
    center_col: usize,
    pad_length: usize,
) -> DatasetResult<ArrayView3<'_, f32>> {
    let (rows, cols, _) = padded.dim();
    let fits = center_row >= pad_length
        && center_col >= pad_length
        && center_row + pad_length < rows
        && center_col + pad_length < cols;
    if !fits {
        return Err(PatchDatasetError::WindowOutOfRange {
            row: center_row,
            col: center_col,
            pad_length,
            padded_rows: rows,
            padded_cols: cols,
        });
    }
    Ok(padded.slice_move(s![
        center_row - pad_length..=center_row + pad_length,
        center_col - pad_length..=center_col + pad_length,
        ..
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::to_coordinate;
    use crate::pad::pad_cube;
    use data_contracts::PaddingMode;
    use ndarray::{Array, Array3};

    fn cube() -> Array3<f32> {
        Array::from_shape_fn((4, 5, 3), |(r, c, b)| (r * 100 + c * 10 + b) as f32)
    }

    #[test]
    fn patch_shape_and_center_for_every_pixel() {
        let cube = cube();
        for p in 0..3 {
            let padded = pad_cube(cube.view(), p, PaddingMode::Zero).unwrap();
            for i in 0..20 {
                let (r, c) = to_coordinate(i, 5, p);
                let patch = extract_patch(padded.view(), r, c, p).unwrap();
                assert_eq!(patch.dim(), (2 * p + 1, 2 * p + 1, 3));
                assert_eq!(
                    patch.slice(s![p, p, ..]),
                    padded.view().slice(s![r, c, ..])
                );
                assert_eq!(patch[[p, p, 2]], cube[[i / 5, i % 5, 2]]);
            }
        }
    }

    #[test]
    fn corner_patch_includes_zero_margin() {
        let cube = cube();
        let padded = pad_cube(cube.view(), 1, PaddingMode::Zero).unwrap();
        let patch = padded.patch(1, 1).unwrap();
        assert_eq!(patch[[0, 0, 0]], 0.0);
        assert_eq!(patch[[1, 1, 1]], cube[[0, 0, 1]]);
        assert_eq!(patch[[2, 2, 0]], cube[[1, 1, 0]]);
    }

    #[test]
    fn unpadded_coordinate_is_rejected() {
        let cube = cube();
        let padded = pad_cube(cube.view(), 2, PaddingMode::Zero).unwrap();
        let err = extract_patch(padded.view(), 0, 3, 2).unwrap_err();
        assert!(err.is_index_range());
        assert!(extract_patch(padded.view(), 6, 3, 2).is_err());
        assert!(extract_patch(padded.view(), 5, 6, 2).is_ok());
    }
}

//! Flat pixel index <-> (row, col) arithmetic.
//!
//! Flat indices are row-major over the unpadded image. Coordinates returned by
//! [`to_coordinate`] are already shifted into padded space.

use crate::types::{DatasetResult, PatchDatasetError};

/// Padded-space `(row, col)` of flat pixel `index`.
///
/// `num_cols` must be non-zero.
pub fn to_coordinate(index: usize, num_cols: usize, pad_length: usize) -> (usize, usize) {
    (index / num_cols + pad_length, index % num_cols + pad_length)
}

/// Row-major flat index of `(row, col)`.
pub fn to_flat_index(row: usize, col: usize, num_cols: usize) -> usize {
    row * num_cols + col
}

/// Bounds-checked indexer for one image and padding margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelIndexer {
    rows: usize,
    cols: usize,
    pad_length: usize,
}

impl PixelIndexer {
    pub fn new(rows: usize, cols: usize, pad_length: usize) -> Self {
        Self {
            rows,
            cols,
            pad_length,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn pad_length(&self) -> usize {
        self.pad_length
    }

    pub fn padded_coordinate(&self, index: usize) -> DatasetResult<(usize, usize)> {
        let pixels = self.pixel_count();
        if index >= pixels {
            return Err(PatchDatasetError::PixelOutOfRange { index, pixels });
        }
        Ok(to_coordinate(index, self.cols, self.pad_length))
    }

    /// Undo the padding offset.
    pub fn to_unpadded(&self, row: usize, col: usize) -> DatasetResult<(usize, usize)> {
        let p = self.pad_length;
        let in_bounds = row >= p && col >= p && row - p < self.rows && col - p < self.cols;
        if !in_bounds {
            return Err(PatchDatasetError::WindowOutOfRange {
                row,
                col,
                pad_length: 0,
                padded_rows: self.rows + 2 * p,
                padded_cols: self.cols + 2 * p,
            });
        }
        Ok((row - p, col - p))
    }

    /// Flat index of a padded-space coordinate.
    pub fn flat_index_of(&self, row: usize, col: usize) -> DatasetResult<usize> {
        let (r, c) = self.to_unpadded(row, col)?;
        Ok(to_flat_index(r, c, self.cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_round_trip_without_padding() {
        for cols in 1..7 {
            for i in 0..cols * 5 {
                let (r, c) = to_coordinate(i, cols, 0);
                assert_eq!(to_flat_index(r, c, cols), i);
            }
        }
    }

    #[test]
    fn coordinate_applies_padding_offset() {
        assert_eq!(to_coordinate(0, 340, 5), (5, 5));
        assert_eq!(to_coordinate(341, 340, 5), (6, 6));
        assert_eq!(to_coordinate(339, 340, 2), (2, 341));
    }

    #[test]
    fn indexer_rejects_out_of_range_pixels() {
        let idx = PixelIndexer::new(3, 4, 1);
        assert_eq!(idx.padded_coordinate(11).unwrap(), (3, 4));
        let err = idx.padded_coordinate(12).unwrap_err();
        assert!(err.is_index_range());
    }

    #[test]
    fn indexer_inverts_padded_coordinates() {
        let idx = PixelIndexer::new(3, 4, 2);
        for i in 0..12 {
            let (r, c) = idx.padded_coordinate(i).unwrap();
            assert_eq!(idx.flat_index_of(r, c).unwrap(), i);
        }
        assert!(idx.to_unpadded(1, 3).is_err());
        assert!(idx.to_unpadded(5, 2).is_err());
    }
}

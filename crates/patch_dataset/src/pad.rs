//! Spatial padding of the data cube.

use crate::types::{try_zeroed, DatasetResult, PatchDatasetError};
use data_contracts::PaddingMode;
use ndarray::{s, Array3, ArrayView3};

/// Cube with a margin of `pad_length` on both spatial axes.
///
/// Immutable once built; only views are handed out.
#[derive(Debug, Clone)]
pub struct PaddedCube {
    data: Array3<f32>,
    pad_length: usize,
}

impl PaddedCube {
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn pad_length(&self) -> usize {
        self.pad_length
    }

    /// Padded shape `(rows + 2P, cols + 2P, bands)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Shape of the cube before padding.
    pub fn source_dim(&self) -> (usize, usize, usize) {
        let (r, c, b) = self.data.dim();
        (r - 2 * self.pad_length, c - 2 * self.pad_length, b)
    }

    /// Window centred on a padded-space coordinate, using this cube's margin.
    pub fn patch(&self, center_row: usize, center_col: usize) -> DatasetResult<ArrayView3<'_, f32>> {
        crate::patch::extract_patch(self.data.view(), center_row, center_col, self.pad_length)
    }
}

/// Pad `cube` by `pad_length` on rows and columns; bands are untouched.
pub fn pad_cube(
    cube: ArrayView3<'_, f32>,
    pad_length: usize,
    mode: PaddingMode,
) -> DatasetResult<PaddedCube> {
    let (rows, cols, bands) = cube.dim();
    if rows == 0 || cols == 0 || bands == 0 {
        return Err(PatchDatasetError::Configuration(format!(
            "cannot pad an empty cube of shape ({rows}, {cols}, {bands})"
        )));
    }
    let p = pad_length;
    let shape = [rows + 2 * p, cols + 2 * p, bands];
    let buf = try_zeroed(&shape)?;
    let mut data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), buf)
        .map_err(|e| PatchDatasetError::Configuration(e.to_string()))?;

    data.slice_mut(s![p..p + rows, p..p + cols, ..]).assign(&cube);

    if mode == PaddingMode::Replicate && p > 0 {
        for i in 0..shape[0] {
            let src_i = i.saturating_sub(p).min(rows - 1);
            let interior_row = i >= p && i < p + rows;
            for j in 0..shape[1] {
                let interior_col = j >= p && j < p + cols;
                if interior_row && interior_col {
                    continue;
                }
                let src_j = j.saturating_sub(p).min(cols - 1);
                data.slice_mut(s![i, j, ..])
                    .assign(&cube.slice(s![src_i, src_j, ..]));
            }
        }
    }

    log::debug!(
        "padded cube ({rows}, {cols}, {bands}) -> {:?} ({})",
        data.dim(),
        mode.as_str()
    );

    Ok(PaddedCube {
        data,
        pad_length,
    })
}

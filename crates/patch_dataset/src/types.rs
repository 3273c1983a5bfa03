//! Core types, error definitions, and data structures for patch_dataset.

use crate::splits::StratifiedSplit;
use data_contracts::PaddingMode;
use ndarray::{s, Array2, Array4};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, PatchDatasetError>;

#[derive(Debug, Error)]
pub enum PatchDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Mismatched dimensions, bad fractions, or slice sizes that do not fit.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Flat pixel index outside `0..rows*cols`.
    #[error("pixel index {index} out of range for {pixels} pixels")]
    PixelOutOfRange { index: usize, pixels: usize },
    /// Patch window leaves the padded array (usually an unpadded coordinate).
    #[error(
        "window of radius {pad_length} at ({row}, {col}) exceeds padded array {padded_rows}x{padded_cols}"
    )]
    WindowOutOfRange {
        row: usize,
        col: usize,
        pad_length: usize,
        padded_rows: usize,
        padded_cols: usize,
    },
    #[error("pixel {index} is unlabeled and has no class to encode")]
    Unlabeled { index: usize },
    #[error("cannot allocate dense tensor of shape {shape:?}")]
    ResourceExhaustion { shape: Vec<usize> },
}

impl PatchDatasetError {
    /// True for the bound violations that indicate an integration error.
    pub fn is_index_range(&self) -> bool {
        matches!(
            self,
            PatchDatasetError::PixelOutOfRange { .. } | PatchDatasetError::WindowOutOfRange { .. }
        )
    }
}

/// Allocate a zero-filled buffer for `shape`, reporting failure instead of aborting.
pub(crate) fn try_zeroed(shape: &[usize]) -> DatasetResult<Vec<f32>> {
    let exhausted = || PatchDatasetError::ResourceExhaustion {
        shape: shape.to_vec(),
    };
    let elems = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(exhausted)?;
    elems
        .checked_mul(std::mem::size_of::<f32>())
        .filter(|bytes| *bytes <= isize::MAX as usize)
        .ok_or_else(exhausted)?;
    let mut buf: Vec<f32> = Vec::new();
    buf.try_reserve_exact(elems).map_err(|_| exhausted())?;
    buf.resize(elems, 0.0);
    Ok(buf)
}

/// Parameters fixed for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    pub pad_length: usize,
    /// Fraction of each class sent to the eval set, in (0, 1).
    pub eval_fraction: f64,
    pub padding: PaddingMode,
    /// One-hot width. `None` uses the largest label present.
    pub num_classes: Option<usize>,
}

impl BuildConfig {
    pub fn new(pad_length: usize, eval_fraction: f64) -> Self {
        Self {
            pad_length,
            eval_fraction,
            padding: PaddingMode::Zero,
            num_classes: None,
        }
    }

    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = Some(num_classes);
        self
    }

    pub fn patch_size(&self) -> usize {
        2 * self.pad_length + 1
    }
}

/// Patches, one-hot labels and the pixel each row came from.
///
/// Row `i` of `patches`, `labels` and `classes` all describe flat pixel
/// `indices[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet {
    pub indices: Vec<usize>,
    /// Shape `(n, 2P+1, 2P+1, bands)`.
    pub patches: Array4<f32>,
    /// One-hot, shape `(n, K)`.
    pub labels: Array2<f32>,
    /// 0-based class per row.
    pub classes: Vec<usize>,
}

impl PatchSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.ncols()
    }

    pub fn patch_dims(&self) -> (usize, usize, usize) {
        let (_, r, c, b) = self.patches.dim();
        (r, c, b)
    }

    /// Rows `start..end` as an owned set.
    pub fn select(&self, start: usize, end: usize) -> PatchSet {
        PatchSet {
            indices: self.indices[start..end].to_vec(),
            patches: self.patches.slice(s![start..end, .., .., ..]).to_owned(),
            labels: self.labels.slice(s![start..end, ..]).to_owned(),
            classes: self.classes[start..end].to_vec(),
        }
    }

    /// Split into `(test, validation)` where validation is the trailing
    /// `val_size` rows and test is everything before it.
    pub fn split_tail(&self, val_size: usize) -> DatasetResult<(PatchSet, PatchSet)> {
        let len = self.len();
        if val_size == 0 || val_size >= len {
            return Err(PatchDatasetError::Configuration(format!(
                "val_size {val_size} must be in 1..{len} for an eval set of {len} samples"
            )));
        }
        let cut = len - val_size;
        Ok((self.select(0, cut), self.select(cut, len)))
    }
}

/// Output of one iteration of [`crate::DatasetBuilder::build`].
#[derive(Debug, Clone)]
pub struct SplitDataset {
    pub seed: u64,
    pub train: PatchSet,
    pub eval: PatchSet,
    pub split: StratifiedSplit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn toy_set(n: usize) -> PatchSet {
        PatchSet {
            indices: (0..n).map(|i| i * 10).collect(),
            patches: Array::from_shape_fn((n, 1, 1, 2), |(i, _, _, b)| (i * 2 + b) as f32),
            labels: Array2::from_shape_fn((n, 3), |(i, k)| if i % 3 == k { 1.0 } else { 0.0 }),
            classes: (0..n).map(|i| i % 3).collect(),
        }
    }

    #[test]
    fn split_tail_takes_validation_from_the_end() {
        let set = toy_set(5);
        let (test, val) = set.split_tail(2).unwrap();
        assert_eq!(test.indices, vec![0, 10, 20]);
        assert_eq!(val.indices, vec![30, 40]);
        assert_eq!(val.patches[[0, 0, 0, 1]], 7.0);
        assert_eq!(val.classes, vec![0, 1]);
        assert_eq!(test.labels.nrows(), 3);
    }

    #[test]
    fn split_tail_rejects_oversized_validation() {
        let set = toy_set(4);
        assert!(matches!(
            set.split_tail(4),
            Err(PatchDatasetError::Configuration(_))
        ));
        assert!(matches!(
            set.split_tail(0),
            Err(PatchDatasetError::Configuration(_))
        ));
    }

    #[test]
    fn try_zeroed_reports_overflow() {
        let err = try_zeroed(&[usize::MAX, 2]).unwrap_err();
        match err {
            PatchDatasetError::ResourceExhaustion { shape } => assert_eq!(shape, vec![usize::MAX, 2]),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(try_zeroed(&[2, 3]).unwrap().len(), 6);
    }
}

//! Shape checks and label-map summaries.

use crate::types::{DatasetResult, PatchDatasetError};
use ndarray::{ArrayView2, ArrayView3};
use serde::Serialize;

/// Cube and label map must agree on the spatial shape and be non-empty.
pub fn validate_shapes(cube: ArrayView3<'_, f32>, labels: ArrayView2<'_, u16>) -> DatasetResult<()> {
    let (rows, cols, bands) = cube.dim();
    if rows == 0 || cols == 0 || bands == 0 {
        return Err(PatchDatasetError::Configuration(format!(
            "cube has an empty axis: ({rows}, {cols}, {bands})"
        )));
    }
    if labels.dim() != (rows, cols) {
        let (lr, lc) = labels.dim();
        return Err(PatchDatasetError::Configuration(format!(
            "label map {lr}x{lc} does not match cube {rows}x{cols}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub rows: usize,
    pub cols: usize,
    pub background: usize,
    /// `class_counts[k]` is the number of pixels with stored label `k + 1`.
    pub class_counts: Vec<usize>,
}

impl LabelSummary {
    pub fn labelled(&self) -> usize {
        self.class_counts.iter().sum()
    }

    pub fn num_classes(&self) -> usize {
        self.class_counts.len()
    }

    /// 1-based labels in `1..=K` with no pixels.
    pub fn empty_classes(&self) -> Vec<u16> {
        self.class_counts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(k, _)| (k + 1) as u16)
            .collect()
    }
}

pub fn summarize_labels(labels: ArrayView2<'_, u16>) -> LabelSummary {
    let (rows, cols) = labels.dim();
    let max_label = labels.iter().copied().max().unwrap_or(0) as usize;
    let mut class_counts = vec![0usize; max_label];
    let mut background = 0;
    for &label in labels.iter() {
        match label {
            0 => background += 1,
            k => class_counts[k as usize - 1] += 1,
        }
    }
    LabelSummary {
        rows,
        cols,
        background,
        class_counts,
    }
}
